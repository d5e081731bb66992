//! Run command implementation.
//!
//! The run command:
//! 1. Prepares the child process and its pipe
//! 2. Starts the bridge and parser threads
//! 3. Drains events to the chosen sinks
//! 4. Reports how the child exited

use super::drain::{drain_events, DynSink, RawOutput};
use super::models::{OutputTarget, RunArgs};
use crate::bridge::ProcessBridge;
use crate::parser::{ParseSummary, ParserConfig, TraceParser, TracePatterns};
use crate::output::EventSink;
use crate::utils::cancel::CancellationToken;
use crate::utils::error::BridgeError;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Execute the run command
///
/// **Public** - main entry point called from main.rs
///
/// Events go to `args.events_to`; unmatched lines are forwarded to the
/// parent's stream matching the one intercepted from the child. Ctrl-C
/// cancels both the child and the parser.
///
/// # Errors
/// * Invalid arguments
/// * Pipe creation failure
/// * Child launch failure or unsuccessful exit
/// * Trace read or output write failures
pub fn execute_run(args: RunArgs) -> Result<ParseSummary> {
    validate_args(&args)?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt, stopping child");
        handler_token.cancel();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let events: Arc<DynSink> = Arc::new(EventSink::new(open_target(args.events_to)));
    let raw_target = OutputTarget::from(args.stream);
    let raw = if raw_target == args.events_to {
        events.clone()
    } else {
        Arc::new(EventSink::new(open_target(raw_target)))
    };

    run_with_sinks(args, events, raw, cancel)
}

/// Run a traced child with caller-provided sinks
///
/// **Public** - the part of execute_run that does not touch process-wide
/// state, usable from tests
pub fn run_with_sinks(
    args: RunArgs,
    events: Arc<DynSink>,
    raw: Arc<DynSink>,
    cancel: CancellationToken,
) -> Result<ParseSummary> {
    validate_args(&args)?;
    let start_time = Instant::now();

    let patterns = Arc::new(TracePatterns::new().context("Failed to compile trace patterns")?);

    let mut bridge = ProcessBridge::new(&args.command, args.stream)
        .context("Failed to prepare child process")?
        .with_cancellation(cancel.clone());
    for (key, value) in &args.env {
        bridge = bridge.with_env(key, value);
    }

    let reader = bridge
        .take_reader()
        .context("Pipe reader was already taken")?;

    let config = ParserConfig::new()
        .with_selector(args.format.clone())
        .with_cancellation(cancel.clone());
    let (parser, receivers) = TraceParser::from_reader(reader, patterns, config);

    info!("Running {} (tracing {})", args.command.join(" "), args.stream);

    let bridge_thread = thread::Builder::new()
        .name("bridge".to_string())
        .spawn(move || bridge.run())
        .context("Failed to spawn bridge thread")?;

    let parser_thread = match thread::Builder::new()
        .name("parser".to_string())
        .spawn(move || parser.run())
    {
        Ok(handle) => handle,
        Err(e) => {
            // Without a parser nobody drains the pipe
            cancel.cancel();
            match bridge_thread.join() {
                Ok(exit) => debug!("Bridge stopped after parser spawn failure: {:?}", exit),
                Err(_) => debug!("Bridge thread panicked after parser spawn failure"),
            }
            return Err(e).context("Failed to spawn parser thread");
        }
    };

    let drained = drain_events(receivers, events, RawOutput::Forward(raw), &cancel);

    if parser_thread.join().is_err() {
        warn!("Parser thread panicked");
    }

    let exit = bridge_thread
        .join()
        .map_err(|_| anyhow::anyhow!("Bridge thread panicked"))?;

    debug!("Run finished in {:.2}s", start_time.elapsed().as_secs_f64());

    match exit {
        Ok(status) => info!("Child exited with {}", status),
        Err(BridgeError::Cancelled) => anyhow::bail!("Interrupted, child process was stopped"),
        Err(e) => return Err(e).context(format!("Child process {} failed", args.command[0])),
    }

    drained
}

/// Validate run arguments
///
/// **Public** - can be called before execute_run for early validation
pub fn validate_args(args: &RunArgs) -> Result<()> {
    if args.command.is_empty() {
        anyhow::bail!("No command given to run");
    }

    if args.command[0].trim().is_empty() {
        anyhow::bail!("Program name cannot be empty");
    }

    if let Some((key, _)) = args.env.iter().find(|(key, _)| key.is_empty() || key.contains('=')) {
        anyhow::bail!("Invalid environment variable name: {:?}", key);
    }

    Ok(())
}

/// Open a process stream as a boxed writer
///
/// **Private** - internal helper for execute_run
fn open_target(target: OutputTarget) -> Box<dyn Write + Send> {
    match target {
        OutputTarget::Stdout => Box::new(std::io::stdout()),
        OutputTarget::Stderr => Box::new(std::io::stderr()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args_valid() {
        let args = RunArgs {
            command: vec!["echo".to_string(), "hi".to_string()],
            ..Default::default()
        };

        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_empty_command() {
        let args = RunArgs::default();

        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_blank_program() {
        let args = RunArgs {
            command: vec!["  ".to_string()],
            ..Default::default()
        };

        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_bad_env_key() {
        let args = RunArgs {
            command: vec!["true".to_string()],
            env: vec![("A=B".to_string(), "1".to_string())],
            ..Default::default()
        };

        assert!(validate_args(&args).is_err());
    }
}
