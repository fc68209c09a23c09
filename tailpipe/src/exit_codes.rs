//! Stable exit codes for the `tailpipe` binary.
//!
//! When the child runs to completion the binary exits with the child's own
//! code, acceptable or not; the codes below cover everything else.

/// Child exited 0 (or the run needed no child at all).
pub const OK: i32 = 0;
/// Invalid invocation: bad flags, malformed `--env`, unreadable config.
pub const USAGE: i32 = 2;
/// The child outlived its timeout budget and was killed.
pub const TIMEOUT: i32 = 124;
/// The child process could not be created or reaped.
pub const SPAWN_FAILED: i32 = 125;
