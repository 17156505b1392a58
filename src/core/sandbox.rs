use std::sync::Arc;

use crate::core::{
    domain::{Artifact, ExecutionRequest, ExecutionResult},
    errors::SandboxError,
    language::{LanguageDescriptor, LanguageRegistry},
    traits::executor::{CompileError, Executor},
};

/// Result of preparing a submission for execution.
#[derive(Debug)]
pub enum Prepared {
    Ready(Artifact),
    /// The compile step failed; the result carries the diagnostic.
    Rejected(ExecutionResult),
}

/// Entry point for running untrusted code once.
#[derive(Clone, Debug)]
pub struct Sandbox {
    registry: Arc<LanguageRegistry>,
    executor: Arc<dyn Executor>,
}

impl Sandbox {
    pub fn new(registry: Arc<LanguageRegistry>, executor: Arc<dyn Executor>) -> Self {
        Self { registry, executor }
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn resolve(&self, language_id: &str) -> Result<&LanguageDescriptor, SandboxError> {
        self.registry.resolve(language_id)
    }

    /// Compiles (when needed) and runs the code against a single stdin.
    #[tracing::instrument(skip_all, fields(language = %request.language_id))]
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, SandboxError> {
        let language = self.resolve(&request.language_id)?;

        let artifact = match self.prepare(&request.code, language).await? {
            Prepared::Ready(artifact) => artifact,
            Prepared::Rejected(result) => return Ok(result),
        };

        let result = self.executor.run(&artifact, &request.stdin).await?;
        tracing::debug!(
            "Execution finished: exit_code={}, timed_out={}, wall_time_ms={}",
            result.exit_code,
            result.timed_out,
            result.wall_time_ms
        );
        Ok(result)
    }

    pub async fn prepare(
        &self,
        code: &str,
        language: &LanguageDescriptor,
    ) -> Result<Prepared, SandboxError> {
        match self.executor.compile(code, language).await {
            Ok(artifact) => Ok(Prepared::Ready(artifact)),
            Err(CompileError::Sandbox(e)) => Err(e),
            Err(e) => {
                tracing::debug!("Compilation rejected: {}", e);
                Ok(Prepared::Rejected(rejected_result(e)))
            }
        }
    }

    pub async fn run(&self, artifact: &Artifact, stdin: &str) -> Result<ExecutionResult, SandboxError> {
        self.executor.run(artifact, stdin).await
    }
}

fn rejected_result(err: CompileError) -> ExecutionResult {
    let (msg, exit_code, wall_time_ms) = match err {
        CompileError::CompilationFailed {
            msg,
            exit_code,
            wall_time_ms,
        } => (msg, exit_code, wall_time_ms),
        CompileError::TimedOut { limit_ms } => (
            format!("compilation timed out after {} ms", limit_ms),
            -1,
            limit_ms,
        ),
        CompileError::Sandbox(e) => (e.to_string(), -1, 0),
    };

    ExecutionResult {
        stdout: String::new(),
        error: Some(format!("Compilation Error:\n{}", msg)),
        exit_code,
        wall_time_ms,
        timed_out: false,
        compile_failed: true,
    }
}
