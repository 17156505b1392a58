//! Fixtures shared by unit tests.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::{
    domain::{Artifact, ExecutionResult, TestCase},
    language::Invocation,
    workspace::Workspace,
};

pub fn artifact(language: &str) -> Artifact {
    let id = Uuid::new_v4();
    Artifact {
        id,
        language: language.to_string(),
        invocation: Invocation {
            program: "/bin/true".into(),
            args: vec![],
        },
        workspace: Arc::new(Workspace::detached(PathBuf::from(format!(
            "/nonexistent/coderunner/{}",
            id
        )))),
    }
}

pub fn run_result(stdout: &str, exit_code: i32) -> ExecutionResult {
    ExecutionResult {
        stdout: stdout.to_string(),
        error: (exit_code != 0).then(|| format!("Runtime Error (exit code: {})", exit_code)),
        exit_code,
        wall_time_ms: 10,
        timed_out: false,
        compile_failed: false,
    }
}

pub fn timed_out_result(limit_ms: u64) -> ExecutionResult {
    ExecutionResult {
        stdout: String::new(),
        error: Some(format!("Time Limit Exceeded (exceeded {} ms)", limit_ms)),
        exit_code: -1,
        wall_time_ms: limit_ms,
        timed_out: true,
        compile_failed: false,
    }
}

pub fn test_case(id: &str, input: &str, expected: &str, order: i32) -> TestCase {
    TestCase {
        id: id.to_string(),
        input: input.to_string(),
        expected: expected.to_string(),
        is_hidden: false,
        order,
    }
}
