//! Error kinds for executable runs.
//!
//! Both failure kinds from the run contract are raised synchronously at the
//! point of detection and are never retried: [`RunError::Spawn`] at launch
//! time, [`RunError::UnexpectedExitStatus`] after the output stream is
//! exhausted and the child has been reaped. The exit-status error embeds
//! the full diagnostic (command, code, trailing output) in its `Display`
//! output so callers can report it without any logging collaborator.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    /// The command list was empty.
    #[error("command must contain at least an executable name")]
    EmptyCommand,

    /// The child process could not be created (missing executable,
    /// permission denied, invalid working directory).
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The child could not be reaped after its output ended.
    #[error("failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The child ran to completion but its exit code was outside the
    /// acceptable set.
    #[error("{}", unexpected_exit_report(.command, .exit_code, .tail))]
    UnexpectedExitStatus {
        command: String,
        exit_code: i32,
        tail: Vec<String>,
    },

    /// The child was still running when its wall-clock budget expired and
    /// was killed.
    #[error("{}", timeout_report(.command, .timeout_secs, .tail))]
    Timeout {
        command: String,
        timeout_secs: u64,
        tail: Vec<String>,
    },
}

fn unexpected_exit_report(command: &str, exit_code: &i32, tail: &[String]) -> String {
    let mut report = format!(
        "executable returned unexpected exit status:\n- command: {command}\n- exit status: {exit_code}\n- output:"
    );
    push_tail(&mut report, tail);
    report
}

fn timeout_report(command: &str, timeout_secs: &u64, tail: &[String]) -> String {
    let mut report =
        format!("executable timed out after {timeout_secs}s:\n- command: {command}\n- output:");
    push_tail(&mut report, tail);
    report
}

fn push_tail(report: &mut String, tail: &[String]) {
    for line in tail {
        report.push_str("\n> ");
        report.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_report_carries_command_code_and_tail() {
        let err = RunError::UnexpectedExitStatus {
            command: "ls -l /foo".to_string(),
            exit_code: 2,
            tail: vec!["No such file".to_string()],
        };
        let report = err.to_string();
        assert!(report.contains("- command: ls -l /foo"));
        assert!(report.contains("- exit status: 2"));
        assert!(report.contains("\n> No such file"));
    }

    #[test]
    fn spawn_error_names_the_command() {
        let err = RunError::Spawn {
            command: "nope".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("failed to spawn `nope`"));
    }

    #[test]
    fn timeout_report_carries_budget_and_tail() {
        let err = RunError::Timeout {
            command: "sleep 30".to_string(),
            timeout_secs: 5,
            tail: vec!["still going".to_string()],
        };
        let report = err.to_string();
        assert!(report.contains("timed out after 5s"));
        assert!(report.contains("\n> still going"));
    }
}
