//! Runtime configuration read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_COMPILE_TIMEOUT_MS, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_MS,
    DEFAULT_WORK_DIR_NAME, ENV_COMPILE_TIMEOUT_MS, ENV_MAX_OUTPUT_BYTES, ENV_MEMORY_LIMIT_BYTES,
    ENV_TIMEOUT_MS, ENV_WORK_DIR,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got `{value}`")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

/// Limits applied to every compile and run step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub timeout_ms: u64,
    pub compile_timeout_ms: u64,
    /// Per stream. Output past the cap is read and discarded.
    pub max_output_bytes: usize,
    /// Address-space limit for the run step.
    pub memory_limit_bytes: Option<u64>,
}

impl ExecutionLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compile_timeout_ms: DEFAULT_COMPILE_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            memory_limit_bytes: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub limits: ExecutionLimits,
    /// Root under which every execution gets its own directory.
    pub work_dir: PathBuf,
}

impl Config {
    /// Loads `.env` when present, then reads `CODERUNNER_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let limits = ExecutionLimits {
            timeout_ms: positive(&lookup, ENV_TIMEOUT_MS)?.unwrap_or(DEFAULT_TIMEOUT_MS),
            compile_timeout_ms: positive(&lookup, ENV_COMPILE_TIMEOUT_MS)?
                .unwrap_or(DEFAULT_COMPILE_TIMEOUT_MS),
            max_output_bytes: positive(&lookup, ENV_MAX_OUTPUT_BYTES)?
                .unwrap_or(DEFAULT_MAX_OUTPUT_BYTES),
            memory_limit_bytes: positive(&lookup, ENV_MEMORY_LIMIT_BYTES)?,
        };

        let work_dir = lookup(ENV_WORK_DIR)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join(DEFAULT_WORK_DIR_NAME));

        Ok(Self { limits, work_dir })
    }
}

fn positive<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };

    let parsed: T = value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.clone(),
    })?;
    if parsed == T::default() {
        return Err(ConfigError::Zero { key });
    }
    Ok(Some(parsed))
}
