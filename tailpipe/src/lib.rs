//! Line-streaming child process execution with bounded diagnostics.
//!
//! `tailpipe` runs a command with its stderr merged into stdout, hands the
//! combined output to the caller one line at a time, keeps a bounded tail of
//! the most recent lines, and validates the final exit code against a
//! caller-supplied set of acceptable values. The architecture enforces a
//! strict separation:
//!
//! - **[`core`]**: pure, deterministic logic (the tail buffer). No I/O,
//!   fully testable in isolation.
//! - **[`io`]**: side-effecting process execution, reachable through the
//!   [`io::runner::CommandRunner`] seam so tests can substitute scripted
//!   runners that never spawn a process.
//!
//! The remaining modules ([`config`], [`logging`], [`errors`],
//! [`exit_codes`]) serve the companion `tailpipe` binary.

pub mod config;
pub mod core;
pub mod errors;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
