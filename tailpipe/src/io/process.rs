//! Spawning children and streaming their merged output line by line.
//!
//! The child's stderr is routed into the same anonymous pipe as its stdout,
//! so the parent observes a single stream interleaved in the order the child
//! wrote it. Consumption is pull-based: each request for the next line may
//! block until the child writes again or closes the pipe. A single
//! background thread reads the pipe and forwards lines over a channel; it
//! exists only so the timeout budget can be enforced while a read would
//! otherwise block, and it preserves the child's write order. After the
//! stream ends, [`Execution::finish`] reaps the child and validates its
//! exit code against the acceptable set.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::tail::{DEFAULT_TAIL_CAPACITY, TailBuffer};
use crate::errors::RunError;

/// Parameters for a single executable run.
///
/// Each run owns an independent tail buffer and exit-status slot; nothing is
/// shared across invocations.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Executable followed by its arguments. Must be non-empty.
    pub command: Vec<String>,
    /// Exit codes treated as success. Defaults to `{0}`. A signal death is
    /// reported as `-1` and may be accepted by including `-1` here.
    pub acceptable_exit_codes: BTreeSet<i32>,
    /// Environment overrides applied on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Working directory for the child.
    pub current_dir: Option<PathBuf>,
    /// Wall-clock budget measured from spawn. When it expires the child is
    /// killed; already-produced lines are still drained, and the run
    /// reports [`RunError::Timeout`].
    pub timeout: Option<Duration>,
    /// Number of trailing output lines retained for diagnostics.
    pub tail_capacity: usize,
}

impl RunRequest {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            acceptable_exit_codes: BTreeSet::from([0]),
            env: BTreeMap::new(),
            current_dir: None,
            timeout: None,
            tail_capacity: DEFAULT_TAIL_CAPACITY,
        }
    }

    /// Space-joined command line used in logs and error reports.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Final result of a run whose exit code was acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// The child's exit code (`-1` when killed by a signal).
    pub exit_code: i32,
    /// The last lines of merged output, oldest first.
    pub tail: Vec<String>,
}

/// Launch the request's command with stderr merged into stdout.
///
/// Spawn failures surface immediately as [`RunError::Spawn`]; they are never
/// retried.
#[instrument(skip_all, fields(command = %request.command_line()))]
pub fn spawn(request: &RunRequest) -> Result<Execution, RunError> {
    let (program, args) = request.command.split_first().ok_or(RunError::EmptyCommand)?;
    let command_line = request.command_line();
    let spawn_err = |source: io::Error| RunError::Spawn {
        command: command_line.clone(),
        source,
    };

    // Both stdio slots are clones of one pipe's write end, so the kernel
    // interleaves stdout and stderr exactly as the child writes them.
    let (reader, stdout_writer) = io::pipe().map_err(spawn_err)?;
    let stderr_writer = stdout_writer.try_clone().map_err(spawn_err)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(stdout_writer)
        .stderr(stderr_writer);
    for (key, value) in &request.env {
        cmd.env(key, value);
    }
    if let Some(dir) = &request.current_dir {
        cmd.current_dir(dir);
    }

    debug!("spawning child process");
    let child = cmd.spawn().map_err(spawn_err)?;
    // The Command still holds the write ends; drop it so the reader sees
    // EOF once the child exits.
    drop(cmd);

    let (tx, lines_rx) = mpsc::channel();
    let reader_thread = thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        loop {
            let mut raw = Vec::new();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {
                    let mut line = String::from_utf8_lossy(&raw).into_owned();
                    if line.ends_with('\n') {
                        line.pop();
                        if line.ends_with('\r') {
                            line.pop();
                        }
                    }
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err));
                    break;
                }
            }
        }
    });

    Ok(Execution {
        child,
        lines_rx,
        reader_thread: Some(reader_thread),
        tail: TailBuffer::new(request.tail_capacity),
        command_line,
        acceptable_exit_codes: request.acceptable_exit_codes.clone(),
        deadline: request.timeout.map(|budget| Instant::now() + budget),
        timeout: request.timeout,
        exit_code: None,
        timed_out: false,
        reached_eof: false,
    })
}

/// An in-flight child process whose merged output is being streamed.
///
/// The output is a single-pass, forward-only sequence: once the pipe
/// reaches EOF, further iteration yields nothing. Call
/// [`finish`](Execution::finish) to reap the child and validate its exit
/// code. Dropping an unfinished execution kills and reaps the child instead
/// of leaking it.
pub struct Execution {
    child: Child,
    lines_rx: Receiver<io::Result<String>>,
    reader_thread: Option<JoinHandle<()>>,
    tail: TailBuffer,
    command_line: String,
    acceptable_exit_codes: BTreeSet<i32>,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
    exit_code: Option<i32>,
    timed_out: bool,
    reached_eof: bool,
}

impl Execution {
    /// Iterator over merged output lines, in the order the child wrote
    /// them. Each produced line is also recorded in the tail buffer.
    pub fn lines(&mut self) -> OutputLines<'_> {
        OutputLines { execution: self }
    }

    /// Trailing lines captured so far, oldest first.
    pub fn tail(&self) -> impl Iterator<Item = &str> {
        self.tail.iter()
    }

    /// Drain any remaining output, reap the child, and validate its exit
    /// code against the acceptable set.
    ///
    /// Draining first means the tail reflects the complete output even when
    /// the caller abandoned iteration early, and no output is lost when the
    /// child exits before the pipe is empty. An exceeded budget is reported
    /// as a timeout even when EOF and exit race past the deadline.
    #[instrument(skip_all, fields(command = %self.command_line))]
    pub fn finish(mut self) -> Result<RunOutcome, RunError> {
        while let Some(line) = self.next_line() {
            if let Err(err) = line {
                warn!(err = %err, "error draining child output");
                break;
            }
        }
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }

        if self.timed_out || self.budget_exhausted() {
            self.kill_expired();
            return Err(self.timeout_error());
        }

        let status = match self.remaining_budget() {
            Some(remaining) => {
                let waited =
                    self.child
                        .wait_timeout(remaining)
                        .map_err(|source| RunError::Wait {
                            command: self.command_line.clone(),
                            source,
                        })?;
                match waited {
                    Some(status) => status,
                    None => {
                        self.kill_expired();
                        return Err(self.timeout_error());
                    }
                }
            }
            None => self.child.wait().map_err(|source| RunError::Wait {
                command: self.command_line.clone(),
                source,
            })?,
        };

        let exit_code = status.code().unwrap_or(-1);
        self.exit_code = Some(exit_code);
        debug!(exit_code, "child process finished");

        if !self.acceptable_exit_codes.contains(&exit_code) {
            return Err(RunError::UnexpectedExitStatus {
                command: self.command_line.clone(),
                exit_code,
                tail: self.tail_lines(),
            });
        }

        Ok(RunOutcome {
            exit_code,
            tail: self.tail_lines(),
        })
    }

    fn next_line(&mut self) -> Option<io::Result<String>> {
        if self.reached_eof {
            return None;
        }
        // A fast-spewing child must not ride out its budget on queued
        // lines; check the deadline before consulting the channel.
        if self.budget_exhausted() {
            self.kill_expired();
        }

        let received = if self.timed_out {
            // Child already killed; the pipe is closing, so a plain
            // blocking drain terminates.
            self.lines_rx.recv().ok()
        } else {
            match self.remaining_budget() {
                Some(remaining) => match self.lines_rx.recv_timeout(remaining) {
                    Ok(line) => Some(line),
                    Err(RecvTimeoutError::Timeout) => {
                        self.kill_expired();
                        self.lines_rx.recv().ok()
                    }
                    Err(RecvTimeoutError::Disconnected) => None,
                },
                None => self.lines_rx.recv().ok(),
            }
        };

        match received {
            None => {
                self.reached_eof = true;
                None
            }
            Some(Ok(line)) => {
                self.tail.push(line.clone());
                Some(Ok(line))
            }
            Some(Err(err)) => Some(Err(err)),
        }
    }

    /// Kill the child once the budget is exhausted so the pipe closes and
    /// the remaining output can drain to EOF.
    fn kill_expired(&mut self) {
        if self.timed_out {
            return;
        }
        self.timed_out = true;
        let timeout_secs = self.timeout.unwrap_or_default().as_secs();
        warn!(timeout_secs, "child outlived its budget, killing");
        if let Err(err) = self.child.kill() {
            warn!(err = %err, "failed to kill timed-out child");
        }
    }

    fn timeout_error(&mut self) -> RunError {
        let _ = self.child.wait();
        self.exit_code = Some(-1);
        RunError::Timeout {
            command: self.command_line.clone(),
            timeout_secs: self.timeout.unwrap_or_default().as_secs(),
            tail: self.tail_lines(),
        }
    }

    fn budget_exhausted(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn remaining_budget(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn tail_lines(&self) -> Vec<String> {
        self.tail.iter().map(str::to_owned).collect()
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        // Abandoned executions must not leak the child or leave a zombie.
        // The reader thread ends on its own once the kill closes the pipe.
        if self.exit_code.is_none() {
            if let Err(err) = self.child.kill() {
                debug!(err = %err, "kill on drop");
            }
            let _ = self.child.wait();
        }
    }
}

/// Single-pass iterator over a child's merged output lines.
///
/// Yields `Err` for I/O failures on the pipe; the caller decides whether to
/// keep iterating.
pub struct OutputLines<'a> {
    execution: &'a mut Execution,
}

impl Iterator for OutputLines<'_> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.execution.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_match_contract() {
        let request = RunRequest::new(["true"]);
        assert_eq!(request.acceptable_exit_codes, BTreeSet::from([0]));
        assert_eq!(request.tail_capacity, DEFAULT_TAIL_CAPACITY);
        assert!(request.timeout.is_none());
        assert!(request.env.is_empty());
    }

    #[test]
    fn empty_command_is_rejected_before_spawn() {
        let request = RunRequest::new(Vec::<String>::new());
        match spawn(&request) {
            Err(RunError::EmptyCommand) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("spawn unexpectedly succeeded"),
        }
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let request = RunRequest::new(["sh", "-c", "printf 'one\\r\\ntwo\\n'"]);
        let mut execution = spawn(&request).expect("spawn");
        let lines: Vec<String> = execution.lines().map(|line| line.expect("line")).collect();
        assert_eq!(lines, vec!["one", "two"]);
        execution.finish().expect("finish");
    }

    #[test]
    fn invalid_utf8_is_replaced_lossily() {
        let request = RunRequest::new(["sh", "-c", "printf 'a\\377b\\n'"]);
        let mut execution = spawn(&request).expect("spawn");
        let lines: Vec<String> = execution.lines().map(|line| line.expect("line")).collect();
        assert_eq!(lines, vec![format!("a{}b", char::REPLACEMENT_CHARACTER)]);
        execution.finish().expect("finish");
    }
}
