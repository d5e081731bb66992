//! Child process launcher with GC tracing enabled.
//!
//! The child gets the parent's environment plus `GODEBUG=gctrace=1`.
//! One of its output streams is redirected into a pipe whose read end is
//! handed to the parser; stdin and the other stream stay connected to the
//! parent.
//!
//! On unix the child leads its own process group. Cancellation signals the
//! whole group, so grandchildren holding a copy of the pipe die too and the
//! reader is guaranteed to reach end of stream.

use crate::utils::cancel::CancellationToken;
use crate::utils::config::{DEFAULT_POLL_INTERVAL, GCTRACE_SWITCH, GODEBUG_VAR};
use crate::utils::error::BridgeError;
use log::{debug, info, warn};
use std::io::{PipeReader, PipeWriter};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

/// Which child stream is intercepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stream {
    Stdout,
    /// The Go runtime writes gctrace lines to stderr
    #[default]
    Stderr,
}

impl std::str::FromStr for Stream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdout" | "out" | "1" => Ok(Self::Stdout),
            "stderr" | "err" | "2" => Ok(Self::Stderr),
            other => Err(format!("unknown stream: {}", other)),
        }
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// A child process wired to an internal pipe
#[derive(Debug)]
pub struct ProcessBridge {
    program: String,
    args: Vec<String>,
    stream: Stream,
    extra_env: Vec<(String, String)>,
    reader: Option<PipeReader>,
    writer: Option<PipeWriter>,
    cancel: CancellationToken,
    poll_interval: Duration,
}

impl ProcessBridge {
    /// Prepare a child process and its pipe
    ///
    /// **Public** - main entry point for launching a traced program
    ///
    /// # Arguments
    /// * `argv` - Program followed by its arguments
    /// * `stream` - Child stream to redirect into the pipe
    ///
    /// # Errors
    /// * `BridgeError::EmptyCommand` - `argv` is empty
    /// * `BridgeError::Pipe` - the OS refused to create a pipe
    pub fn new(argv: &[String], stream: Stream) -> Result<Self, BridgeError> {
        let (program, args) = argv.split_first().ok_or(BridgeError::EmptyCommand)?;
        let (reader, writer) = std::io::pipe().map_err(BridgeError::Pipe)?;

        debug!("Prepared bridge for {} (intercepting {})", program, stream);

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            stream,
            extra_env: Vec::new(),
            reader: Some(reader),
            writer: Some(writer),
            cancel: CancellationToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Set an extra environment variable for the child
    ///
    /// A caller-supplied `GODEBUG` is kept and the trace switch appended to it.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    /// Hand out the read end of the pipe
    ///
    /// Returns `None` once taken. Reading before the child has written
    /// anything simply blocks.
    pub fn take_reader(&mut self) -> Option<PipeReader> {
        self.reader.take()
    }

    /// Run the child to completion
    ///
    /// **Public** - blocks until the child exits or is cancelled
    ///
    /// The parent's copy of the pipe write end is always released before
    /// this returns, whatever the outcome, so the reader reaches end of
    /// stream once the child is gone.
    ///
    /// # Errors
    /// * `BridgeError::AlreadyRun` - the bridge was run before (write end consumed)
    /// * `BridgeError::Spawn` - the program could not be started
    /// * `BridgeError::Wait` - waiting on the child failed
    /// * `BridgeError::ExitStatus` - non-zero exit or killed by a signal
    /// * `BridgeError::Cancelled` - cancellation was requested; the child is killed
    pub fn run(&mut self) -> Result<ExitStatus, BridgeError> {
        let writer = self.writer.take().ok_or(BridgeError::AlreadyRun)?;

        let mut cmd = self.command();
        match self.stream {
            Stream::Stdout => cmd.stdout(Stdio::from(writer)).stderr(Stdio::inherit()),
            Stream::Stderr => cmd.stdout(Stdio::inherit()).stderr(Stdio::from(writer)),
        };

        let spawned = cmd.spawn();
        // Command still owns our copy of the write end
        drop(cmd);

        let mut child = spawned.map_err(|source| BridgeError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        info!("Started {} (pid {})", self.program, child.id());

        let status = self.wait(&mut child)?;
        if !status.success() {
            warn!("{} exited with {}", self.program, status);
            return Err(BridgeError::ExitStatus(status));
        }

        info!("{} exited successfully", self.program);
        Ok(status)
    }

    /// Build the command without stdout/stderr wiring
    ///
    /// **Private** - internal helper for run
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::inherit());

        // Own group, so cancellation reaches every descendant
        #[cfg(unix)]
        cmd.process_group(0);

        for (key, value) in &self.extra_env {
            cmd.env(key, value);
        }

        let existing = self
            .extra_env
            .iter()
            .rev()
            .find(|(key, _)| key == GODEBUG_VAR)
            .map(|(_, value)| value.clone())
            .or_else(|| std::env::var(GODEBUG_VAR).ok());
        cmd.env(GODEBUG_VAR, merge_godebug(existing.as_deref()));

        cmd
    }

    /// Wait for exit while watching for cancellation
    ///
    /// **Private** - internal helper for run
    fn wait(&self, child: &mut Child) -> Result<ExitStatus, BridgeError> {
        loop {
            if self.cancel.is_cancelled() {
                info!("Cancelling {} (pid {})", self.program, child.id());
                kill_tree(child);
                child.wait().map_err(BridgeError::Wait)?;
                return Err(BridgeError::Cancelled);
            }

            if let Some(status) = child.try_wait().map_err(BridgeError::Wait)? {
                return Ok(status);
            }

            thread::sleep(self.poll_interval);
        }
    }
}

/// Kill the child and everything in its process group
///
/// **Private** - internal helper for wait
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // The child's pid is its group id; an unreaped child keeps the group alive
    let group = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        debug!("killpg {} failed: {}", group, e);
        if let Err(e) = child.kill() {
            debug!("kill failed: {}", e);
        }
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    if let Err(e) = child.kill() {
        // Already exited between the check and the kill
        debug!("kill failed: {}", e);
    }
}

/// Append the trace switch to an existing `GODEBUG` value
///
/// Go applies the last occurrence of a repeated key, so the switch wins.
pub fn merge_godebug(existing: Option<&str>) -> String {
    match existing.map(str::trim) {
        Some(value) if !value.is_empty() => format!("{},{}", value, GCTRACE_SWITCH),
        _ => GCTRACE_SWITCH.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_argv_rejected() {
        let result = ProcessBridge::new(&[], Stream::Stdout);
        assert!(matches!(result, Err(BridgeError::EmptyCommand)));
    }

    #[test]
    fn test_merge_godebug() {
        assert_eq!(merge_godebug(None), "gctrace=1");
        assert_eq!(merge_godebug(Some("")), "gctrace=1");
        assert_eq!(merge_godebug(Some("madvdontneed=1")), "madvdontneed=1,gctrace=1");
        assert_eq!(merge_godebug(Some("gctrace=0")), "gctrace=0,gctrace=1");
    }

    #[test]
    fn test_stream_from_str() {
        assert_eq!("stdout".parse::<Stream>().unwrap(), Stream::Stdout);
        assert_eq!("STDERR".parse::<Stream>().unwrap(), Stream::Stderr);
        assert_eq!("2".parse::<Stream>().unwrap(), Stream::Stderr);
        assert!("stdin".parse::<Stream>().is_err());
        assert_eq!(Stream::default(), Stream::Stderr);
    }

    #[test]
    fn test_reader_taken_once() {
        let mut bridge = ProcessBridge::new(&["true".to_string()], Stream::Stdout).unwrap();
        assert!(bridge.take_reader().is_some());
        assert!(bridge.take_reader().is_none());
    }
}
