//! Capability seam for callers that execute commands.
//!
//! The [`CommandRunner`] trait decouples consumers (the CLI, embedding
//! applications) from real process execution. Production code uses
//! [`ProcessRunner`]; tests substitute scripted runners that replay canned
//! output without spawning anything.

use tracing::{instrument, warn};

use crate::errors::RunError;
use crate::io::process::{RunOutcome, RunRequest, spawn};

/// Abstraction over executable-running backends.
pub trait CommandRunner {
    /// Run the request to completion, forwarding each merged output line to
    /// `on_line` as it is produced.
    fn run(
        &self,
        request: &RunRequest,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<RunOutcome, RunError>;
}

/// Real runner that spawns an OS process.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(command = %request.command_line()))]
    fn run(
        &self,
        request: &RunRequest,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<RunOutcome, RunError> {
        let mut execution = spawn(request)?;
        for line in execution.lines() {
            match line {
                Ok(line) => on_line(&line),
                Err(err) => {
                    warn!(err = %err, "error reading child output");
                    break;
                }
            }
        }
        execution.finish()
    }
}
