use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::language::Invocation;
use crate::core::workspace::Workspace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub code: String,
    pub language_id: String,
    pub stdin: String,
}

/// Outcome of one sandbox call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    /// Captured stderr when non-empty, otherwise a synthesized diagnostic for
    /// failed runs.
    pub error: Option<String>,
    pub exit_code: i32,
    pub wall_time_ms: u64,
    pub timed_out: bool,
    /// Set when the result comes from a failed compile step.
    #[serde(default)]
    pub compile_failed: bool,
}

impl ExecutionResult {
    /// Timeout or crash, as opposed to a run that merely printed the wrong
    /// answer. Anything written to stderr counts as a crash.
    pub fn is_hard_failure(&self) -> bool {
        self.timed_out
            || self.exit_code != 0
            || self
                .error
                .as_deref()
                .is_some_and(|error| !error.trim().is_empty())
    }
}

/// A program that is ready to be run, possibly many times.
///
/// Holding the artifact keeps its working directory alive; the directory is
/// removed once the last clone is dropped.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub id: Uuid,
    pub language: String,
    pub invocation: Invocation,
    pub workspace: Arc<Workspace>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub input: String,
    pub expected: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub order: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub test_case_id: String,
    pub passed: bool,
    pub actual: String,
    pub runtime_ms: u64,
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeStatus {
    Accepted,
    WrongAnswer,
    RuntimeError,
    TimeLimitExceeded,
    CompileError,
}

impl JudgeStatus {
    /// Higher wins when two failure classes compete.
    pub fn precedence(&self) -> u8 {
        match self {
            JudgeStatus::Accepted => 0,
            JudgeStatus::WrongAnswer => 1,
            JudgeStatus::RuntimeError => 2,
            JudgeStatus::TimeLimitExceeded => 3,
            JudgeStatus::CompileError => 4,
        }
    }

    /// Keeps whichever of the two statuses ranks higher.
    pub fn escalate(self, other: JudgeStatus) -> JudgeStatus {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeStatus::Accepted => "accepted",
            JudgeStatus::WrongAnswer => "wrong_answer",
            JudgeStatus::RuntimeError => "runtime_error",
            JudgeStatus::TimeLimitExceeded => "time_limit_exceeded",
            JudgeStatus::CompileError => "compile_error",
        }
    }
}

impl std::fmt::Display for JudgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub status: JudgeStatus,
    pub tests_passed: usize,
    pub tests_total: usize,
    pub total_runtime_ms: u64,
    pub outcomes: Vec<TestOutcome>,
    /// Diagnostic of the failure that decided the status.
    pub error_message: Option<String>,
}

/// Lifecycle of one submission inside a judging call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Pending,
    Running,
    Finished(JudgeStatus),
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Finished(_))
    }

    /// Allowed transitions: pending to running or finished (compile errors
    /// and empty test sets never start running), running to finished.
    pub fn can_become(&self, next: SubmissionState) -> bool {
        matches!(
            (self, next),
            (SubmissionState::Pending, SubmissionState::Running)
                | (SubmissionState::Pending, SubmissionState::Finished(_))
                | (SubmissionState::Running, SubmissionState::Finished(_))
        )
    }
}
