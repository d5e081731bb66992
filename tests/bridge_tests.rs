#![cfg(unix)]

use gctrace_bridge::bridge::{ProcessBridge, Stream};
use gctrace_bridge::parser::{GcTrace, ParserConfig, TraceParser, TracePatterns};
use gctrace_bridge::utils::{BridgeError, CancellationToken, ParseError};
use pretty_assertions::assert_eq;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn read_all(bridge: &mut ProcessBridge) -> String {
    let mut reader = bridge.take_reader().unwrap();
    let mut out = String::new();
    reader.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn test_stdout_is_piped() {
    let mut bridge = ProcessBridge::new(&argv(&["echo", "hello world"]), Stream::Stdout).unwrap();

    bridge.run().unwrap();

    assert_eq!(read_all(&mut bridge), "hello world\n");
}

#[test]
fn test_stderr_is_piped() {
    let mut bridge = ProcessBridge::new(
        &argv(&["sh", "-c", "echo to-pipe 1>&2; echo to-parent"]),
        Stream::Stderr,
    )
    .unwrap();

    bridge.run().unwrap();

    assert_eq!(read_all(&mut bridge), "to-pipe\n");
}

#[test]
fn test_gctrace_switch_is_injected() {
    let mut bridge = ProcessBridge::new(&argv(&["sh", "-c", "echo \"$GODEBUG\""]), Stream::Stdout)
        .unwrap()
        .with_env("GODEBUG", "madvdontneed=1")
        .with_env("UNRELATED", "x");

    bridge.run().unwrap();

    assert_eq!(read_all(&mut bridge), "madvdontneed=1,gctrace=1\n");
}

#[test]
fn test_extra_env_reaches_child() {
    let mut bridge = ProcessBridge::new(&argv(&["sh", "-c", "echo \"$TRACE_LABEL\""]), Stream::Stdout)
        .unwrap()
        .with_env("TRACE_LABEL", "svc-a");

    bridge.run().unwrap();

    assert_eq!(read_all(&mut bridge), "svc-a\n");
}

#[test]
fn test_missing_program_is_reported() {
    let mut bridge =
        ProcessBridge::new(&argv(&["/nonexistent/gctrace-test-binary"]), Stream::Stderr).unwrap();

    let result = bridge.run();
    assert!(matches!(result, Err(BridgeError::Spawn { .. })));

    // Write end was released, so the reader sees end of stream
    assert_eq!(read_all(&mut bridge), "");
}

#[test]
fn test_failed_exit_is_reported() {
    let mut bridge =
        ProcessBridge::new(&argv(&["sh", "-c", "echo partial; exit 3"]), Stream::Stdout).unwrap();

    match bridge.run() {
        Err(BridgeError::ExitStatus(status)) => assert_eq!(status.code(), Some(3)),
        other => panic!("expected exit status error, got {:?}", other),
    }

    assert_eq!(read_all(&mut bridge), "partial\n");
}

#[test]
fn test_run_twice_is_rejected() {
    let mut bridge = ProcessBridge::new(&argv(&["true"]), Stream::Stdout).unwrap();

    bridge.run().unwrap();
    assert!(matches!(bridge.run(), Err(BridgeError::AlreadyRun)));
}

#[test]
fn test_cancel_kills_long_running_child() {
    let cancel = CancellationToken::new();
    let mut bridge = ProcessBridge::new(&argv(&["sleep", "30"]), Stream::Stdout)
        .unwrap()
        .with_cancellation(cancel.clone());
    let mut reader = bridge.take_reader().unwrap();

    let started = Instant::now();
    let handle = thread::spawn(move || bridge.run());

    thread::sleep(Duration::from_millis(100));
    cancel.cancel();

    let result = handle.join().unwrap();
    assert!(matches!(result, Err(BridgeError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));

    let mut rest = String::new();
    reader.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "");
}

/// Bridge and parser sharing one token, as the run command wires them
fn cancel_traced_run(argv_parts: &[&str]) {
    let cancel = CancellationToken::new();
    let mut bridge = ProcessBridge::new(&argv(argv_parts), Stream::Stdout)
        .unwrap()
        .with_cancellation(cancel.clone());
    let reader = bridge.take_reader().unwrap();

    let patterns = Arc::new(TracePatterns::new().unwrap());
    let config = ParserConfig::new().with_cancellation(cancel.clone());
    let (parser, receivers) = TraceParser::from_reader(reader, patterns, config);

    let started = Instant::now();
    let bridge_thread = thread::spawn(move || bridge.run());
    thread::spawn(move || parser.run());

    thread::sleep(Duration::from_millis(200));
    cancel.cancel();

    let completion = receivers.done.recv_timeout(Duration::from_secs(5));
    assert!(
        matches!(completion, Ok(Err(ParseError::Cancelled))),
        "parser did not report cancellation: {:?}",
        completion
    );
    assert!(matches!(bridge_thread.join().unwrap(), Err(BridgeError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_cancel_while_parser_waits_on_read() {
    cancel_traced_run(&["sleep", "30"]);
}

#[test]
fn test_cancel_reaches_grandchild_holding_pipe() {
    cancel_traced_run(&["sh", "-c", "sleep 30; echo done"]);
}

#[test]
fn test_cancel_reaches_background_grandchild() {
    cancel_traced_run(&["sh", "-c", "sleep 30 & wait"]);
}

#[test]
fn test_bridge_feeds_parser() {
    let gc_line = "gc 3 @0.016s 2%: 0.011+0.52+0.003 ms clock, 0.045+0.10/0.41/0.30+0.014 ms cpu, 4->4->0 MB, 5 MB goal, 4 P";
    let scvg_line = "scvg0: inuse: 3, idle: 1, sys: 5, released: 0, consumed: 5 (MB)";
    let script = "printf '%s\\n' \"$1\" \"$2\" app-output >&2";

    let mut bridge = ProcessBridge::new(
        &argv(&["sh", "-c", script, "sh", gc_line, scvg_line]),
        Stream::Stderr,
    )
    .unwrap();
    let reader = bridge.take_reader().unwrap();

    let patterns = Arc::new(TracePatterns::new().unwrap());
    let (parser, receivers) = TraceParser::from_reader(reader, patterns, ParserConfig::new());

    let bridge_thread = thread::spawn(move || bridge.run());
    let parser_thread = thread::spawn(move || parser.run());

    let traces = receivers.collect();
    parser_thread.join().unwrap();
    bridge_thread.join().unwrap().unwrap();

    assert_eq!(traces.gc, vec![GcTrace { heap_mb: 5 }]);
    assert_eq!(traces.scvg.len(), 1);
    assert_eq!(traces.scvg[0].sys_mb, 5);
    assert_eq!(traces.raw, vec!["app-output".to_string()]);
    assert_eq!(traces.completion.unwrap().lines, 3);
}

#[test]
fn test_output_larger_than_pipe_buffer() {
    let mut bridge = ProcessBridge::new(&argv(&["seq", "1", "20000"]), Stream::Stdout).unwrap();
    let reader = bridge.take_reader().unwrap();

    let patterns = Arc::new(TracePatterns::new().unwrap());
    let (parser, receivers) = TraceParser::from_reader(reader, patterns, ParserConfig::new());

    let bridge_thread = thread::spawn(move || bridge.run());
    let parser_thread = thread::spawn(move || parser.run());

    let traces = receivers.collect();
    parser_thread.join().unwrap();
    bridge_thread.join().unwrap().unwrap();

    assert_eq!(traces.raw.len(), 20_000);
    assert_eq!(traces.raw.first().map(String::as_str), Some("1"));
    assert_eq!(traces.raw.last().map(String::as_str), Some("20000"));
}
