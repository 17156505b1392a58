use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::config::{Config, ExecutionLimits};
use crate::core::{
    domain::{Artifact, ExecutionResult},
    errors::SandboxError,
    language::LanguageDescriptor,
    traits::executor::{CompileError, Executor},
    workspace::Workspace,
};
use crate::native::process::{self, ProcessOutput, ProcessRequest};

/// Runs toolchains installed on the host, one process group per step.
#[derive(Clone, Debug)]
pub struct NativeExecutor {
    dir: PathBuf,
    limits: ExecutionLimits,
}

impl NativeExecutor {
    pub fn new<T>(dir: T, limits: ExecutionLimits) -> Self
    where
        T: AsRef<Path>,
    {
        NativeExecutor {
            dir: dir.as_ref().into(),
            limits,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.work_dir, config.limits)
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }
}

#[async_trait::async_trait]
impl Executor for NativeExecutor {
    #[tracing::instrument(skip(self, source, language), fields(language = language.id))]
    async fn compile(
        &self,
        source: &str,
        language: &LanguageDescriptor,
    ) -> Result<Artifact, CompileError> {
        let workspace = Workspace::create(&self.dir).await?;
        let paths = language.paths(workspace.path());
        workspace.write(&paths.source, source).await?;

        if let Some(compile) = &language.compile {
            let invocation = compile.resolve(&paths);
            let output = process::run(ProcessRequest {
                invocation: &invocation,
                cwd: workspace.path(),
                stdin: None,
                timeout: self.limits.compile_timeout(),
                max_output_bytes: self.limits.max_output_bytes,
                memory_limit_bytes: None,
            })
            .await?;

            if output.timed_out() {
                return Err(CompileError::TimedOut {
                    limit_ms: self.limits.compile_timeout_ms,
                });
            }
            if !output.success() {
                return Err(CompileError::CompilationFailed {
                    msg: compiler_diagnostic(&output),
                    exit_code: output.exit_code(),
                    wall_time_ms: output.wall_time_ms(),
                });
            }
            tracing::debug!("Compiled in {} ms", output.wall_time_ms());
        }

        Ok(Artifact {
            id: Uuid::new_v4(),
            language: language.id.to_string(),
            invocation: language.run.resolve(&paths),
            workspace: Arc::new(workspace),
        })
    }

    #[tracing::instrument(skip(self, artifact, stdin), fields(artifact = %artifact.id))]
    async fn run(&self, artifact: &Artifact, stdin: &str) -> Result<ExecutionResult, SandboxError> {
        let output = process::run(ProcessRequest {
            invocation: &artifact.invocation,
            cwd: artifact.workspace.path(),
            stdin: Some(stdin),
            timeout: self.limits.timeout(),
            max_output_bytes: self.limits.max_output_bytes,
            memory_limit_bytes: self.limits.memory_limit_bytes,
        })
        .await?;

        Ok(execution_result(output, self.limits.timeout_ms))
    }
}

/// Compilers usually report on stderr, some only on stdout.
fn compiler_diagnostic(output: &ProcessOutput) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).into_owned()
    } else {
        stderr.into_owned()
    }
}

fn execution_result(output: ProcessOutput, timeout_ms: u64) -> ExecutionResult {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let exit_code = output.exit_code();

    let error = if output.timed_out() {
        Some(format!("Time Limit Exceeded (exceeded {} ms)", timeout_ms))
    } else if !stderr.trim().is_empty() {
        Some(stderr.into_owned())
    } else if let Some(signal) = output.signal() {
        Some(format!("Runtime Error (terminated by signal {})", signal))
    } else if exit_code != 0 {
        Some(format!("Runtime Error (exit code: {})", exit_code))
    } else {
        None
    };

    ExecutionResult {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        error,
        exit_code,
        wall_time_ms: output.wall_time_ms(),
        timed_out: output.timed_out(),
        compile_failed: false,
    }
}
