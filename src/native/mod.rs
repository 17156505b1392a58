/// Native module runs toolchains installed on the host directly,
/// isolating each step in its own process group.
pub mod executor;
pub mod probe;
pub mod process;
