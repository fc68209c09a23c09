//! Test-only helpers for exercising executable runs.

use std::path::PathBuf;

use crate::core::tail::TailBuffer;
use crate::errors::RunError;
use crate::io::process::{RunOutcome, RunRequest};
use crate::io::runner::CommandRunner;

/// Request that runs `script` through `sh -c`.
pub fn sh_request(script: &str) -> RunRequest {
    RunRequest::new(["sh", "-c", script])
}

/// Request for a shell loop emitting `count` numbered lines
/// (`line 1` .. `line N`).
pub fn counting_request(count: usize) -> RunRequest {
    sh_request(&format!(
        "i=1; while [ \"$i\" -le {count} ]; do echo \"line $i\"; i=$((i+1)); done"
    ))
}

/// Expected output of [`counting_request`] for the range `from..=to`.
pub fn counting_lines(from: usize, to: usize) -> Vec<String> {
    (from..=to).map(|i| format!("line {i}")).collect()
}

/// Write `contents` to a config file inside a fresh temp dir.
///
/// Returns the dir guard (keep it alive for the test's duration) and the
/// config path.
pub fn temp_config(contents: &str) -> anyhow::Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tailpipe.toml");
    std::fs::write(&path, contents)?;
    Ok((dir, path))
}

/// Scripted runner replaying canned lines and a fixed exit code without
/// spawning a process.
pub struct ScriptedRunner {
    pub lines: Vec<String>,
    pub exit_code: i32,
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        request: &RunRequest,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<RunOutcome, RunError> {
        let mut tail = TailBuffer::new(request.tail_capacity);
        for line in &self.lines {
            tail.push(line.clone());
            on_line(line);
        }
        if !request.acceptable_exit_codes.contains(&self.exit_code) {
            return Err(RunError::UnexpectedExitStatus {
                command: request.command_line(),
                exit_code: self.exit_code,
                tail: tail.into_lines(),
            });
        }
        Ok(RunOutcome {
            exit_code: self.exit_code,
            tail: tail.into_lines(),
        })
    }
}
