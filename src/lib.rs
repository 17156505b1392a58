//! Runs untrusted programs in many languages and judges them against test
//! cases.

use std::collections::BTreeMap;
use std::sync::Arc;

pub mod config;
pub mod constants;
pub mod core;
pub mod native;

#[cfg(test)]
mod testing;

pub use crate::config::{Config, ConfigError, ExecutionLimits};
pub use crate::core::domain::{
    ExecutionRequest, ExecutionResult, JudgeStatus, JudgeVerdict, TestCase, TestOutcome,
};
pub use crate::core::errors::SandboxError;
pub use crate::core::language::{LanguageDescriptor, LanguageRegistry};
pub use crate::core::projection::{HIDDEN_MARKER, OutcomeView, SubmissionView, project};

use crate::core::{
    pipeline::judging::Judge, sandbox::Sandbox, traits::executor::Executor, workspace::Workspace,
};
use crate::native::executor::NativeExecutor;

/// The sandbox and the judge sharing one registry and executor.
#[derive(Clone, Debug)]
pub struct CodeRunner {
    judge: Judge,
}

impl CodeRunner {
    pub fn new(registry: Arc<LanguageRegistry>, executor: Arc<dyn Executor>) -> Self {
        Self {
            judge: Judge::new(Sandbox::new(registry, executor)),
        }
    }

    /// Built-in languages on host toolchains. Creates the work root.
    pub async fn from_config(config: &Config) -> Result<Self, SandboxError> {
        Workspace::init_root(&config.work_dir).await?;
        tracing::info!(
            "Work root {} (timeout {} ms, output cap {} bytes)",
            config.work_dir.display(),
            config.limits.timeout_ms,
            config.limits.max_output_bytes
        );

        Ok(Self::new(
            Arc::new(LanguageRegistry::builtin()),
            Arc::new(NativeExecutor::from_config(config)),
        ))
    }

    pub fn registry(&self) -> &LanguageRegistry {
        self.judge.sandbox().registry()
    }

    pub async fn execute(
        &self,
        code: &str,
        language_id: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        self.judge
            .sandbox()
            .execute(&ExecutionRequest {
                code: code.to_string(),
                language_id: language_id.to_string(),
                stdin: stdin.to_string(),
            })
            .await
    }

    pub async fn judge(
        &self,
        code: &str,
        language_id: &str,
        test_cases: &[TestCase],
    ) -> Result<JudgeVerdict, SandboxError> {
        self.judge.judge(code, language_id, test_cases).await
    }

    pub async fn probe(&self) -> BTreeMap<String, bool> {
        native::probe::probe(self.registry()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::{Arg::*, CommandTemplate};
    use crate::testing::test_case;

    fn shell_runner(root: &tempfile::TempDir, timeout_ms: u64) -> CodeRunner {
        let registry = LanguageRegistry::new(vec![LanguageDescriptor {
            id: "sh",
            source_extension: "sh",
            source_stem: "solution",
            artifact_name: "solution",
            compile: None,
            run: CommandTemplate(&[Lit("sh"), Source]),
        }]);
        let limits = ExecutionLimits {
            timeout_ms,
            ..ExecutionLimits::default()
        };
        CodeRunner::new(
            Arc::new(registry),
            Arc::new(NativeExecutor::new(root.path(), limits)),
        )
    }

    #[tokio::test]
    async fn test_from_config_creates_work_root() {
        let base = tempfile::tempdir().unwrap();
        let config = Config {
            limits: ExecutionLimits::default(),
            work_dir: base.path().join("runs"),
        };

        let runner = CodeRunner::from_config(&config).await.unwrap();
        assert!(config.work_dir.is_dir());
        assert!(runner.registry().resolve("python").is_ok());
    }

    #[tokio::test]
    async fn test_execute_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let runner = shell_runner(&root, 5_000);

        let result = runner.execute("read n; echo $((n * 2))", "sh", "21").await.unwrap();
        assert_eq!(result.stdout, "42\n");
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_judge_and_project_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let runner = shell_runner(&root, 5_000);
        let mut hidden = test_case("hidden", "10", "11", 2);
        hidden.is_hidden = true;
        let cases = vec![
            test_case("first", "1", "2", 0),
            test_case("second", "5", "7", 1),
            hidden,
        ];

        let verdict = runner
            .judge("read n; echo $((n + 1))", "sh", &cases)
            .await
            .unwrap();
        assert_eq!(verdict.status, JudgeStatus::WrongAnswer);
        assert_eq!(verdict.tests_passed, 2);
        assert_eq!(verdict.tests_total, 3);

        let view = project(&verdict, &cases);
        assert_eq!(view.results[1].actual, "6");
        assert_eq!(view.results[2].input, HIDDEN_MARKER);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_crash_after_correct_output_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let runner = shell_runner(&root, 5_000);

        let verdict = runner
            .judge("echo 5; exit 1", "sh", &[test_case("1", "", "5", 0)])
            .await
            .unwrap();
        assert_eq!(verdict.status, JudgeStatus::RuntimeError);
        assert_eq!(verdict.tests_passed, 1);
        assert!(verdict.outcomes[0].passed);
    }

    #[tokio::test]
    async fn test_stderr_from_hidden_case_stays_hidden() {
        let root = tempfile::tempdir().unwrap();
        let runner = shell_runner(&root, 5_000);
        let mut hidden = test_case("hidden", "SECRET_INPUT", "ok", 0);
        hidden.is_hidden = true;
        let cases = vec![hidden];

        let verdict = runner
            .judge("read x; echo \"$x\" >&2; echo ok", "sh", &cases)
            .await
            .unwrap();
        assert_eq!(verdict.status, JudgeStatus::RuntimeError);

        let view = project(&verdict, &cases);
        assert_eq!(view.results[0].input, HIDDEN_MARKER);
        assert_eq!(view.results[0].error.as_deref(), Some(HIDDEN_MARKER));
        assert!(!serde_json::to_string(&view).unwrap().contains("SECRET_INPUT"));
    }

    #[tokio::test]
    async fn test_judge_time_limit_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let runner = shell_runner(&root, 300);
        let cases = vec![test_case("1", "", "done", 0), test_case("2", "", "done", 1)];

        let verdict = runner
            .judge("while :; do :; done", "sh", &cases)
            .await
            .unwrap();
        assert_eq!(verdict.status, JudgeStatus::TimeLimitExceeded);
        assert_eq!(verdict.tests_passed, 0);
        assert_eq!(verdict.outcomes.len(), 1);
    }
}
