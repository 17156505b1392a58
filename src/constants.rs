pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_COMPILE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_WORK_DIR_NAME: &str = "coderunner";
pub const DEFAULT_LOG_FILTER: &str = "coderunner=info";

/// How long pipe readers may keep draining once the process group is gone.
pub const READER_GRACE_MS: u64 = 500;
pub const PROBE_TIMEOUT_MS: u64 = 5_000;

pub const ENV_TIMEOUT_MS: &str = "CODERUNNER_TIMEOUT_MS";
pub const ENV_COMPILE_TIMEOUT_MS: &str = "CODERUNNER_COMPILE_TIMEOUT_MS";
pub const ENV_MAX_OUTPUT_BYTES: &str = "CODERUNNER_MAX_OUTPUT_BYTES";
pub const ENV_MEMORY_LIMIT_BYTES: &str = "CODERUNNER_MEMORY_LIMIT_BYTES";
pub const ENV_WORK_DIR: &str = "CODERUNNER_WORK_DIR";
