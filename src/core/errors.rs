use std::path::PathBuf;

/// Faults that are not caused by the submission itself.
///
/// Everything a submission can do wrong (not compiling, crashing, running too
/// long) is reported inside an `ExecutionResult` or a `JudgeVerdict`. Only the
/// variants below escape to the caller, who is expected to retry or alert.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("failed to prepare working directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Whether the caller can fix the request (as opposed to a host problem).
    pub fn is_caller_error(&self) -> bool {
        matches!(self, SandboxError::UnsupportedLanguage(_))
    }
}
