use crate::core::{
    domain::{Artifact, ExecutionResult},
    errors::SandboxError,
    language::LanguageDescriptor,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    /// Materializes the source in a fresh working directory and runs the
    /// compile step when the language has one.
    async fn compile(
        &self,
        source: &str,
        language: &LanguageDescriptor,
    ) -> Result<Artifact, CompileError>;

    /// Runs a prepared artifact once with the given stdin.
    async fn run(&self, artifact: &Artifact, stdin: &str) -> Result<ExecutionResult, SandboxError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The compiler rejected the source. `msg` is its diagnostic output.
    #[error("compilation failed: {msg}")]
    CompilationFailed {
        msg: String,
        exit_code: i32,
        wall_time_ms: u64,
    },

    #[error("compilation timed out after {limit_ms} ms")]
    TimedOut { limit_ms: u64 },

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}
