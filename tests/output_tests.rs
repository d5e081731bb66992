use gctrace_bridge::output::{event_from_str, event_to_string, EventSink};
use gctrace_bridge::parser::{GcTrace, ScvgTrace, TraceEvent};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

#[test]
fn test_write_events_as_json_lines() {
    let sink = EventSink::new(Vec::new());

    sink.write_event(&TraceEvent::Gc(GcTrace { heap_mb: 7 })).unwrap();
    sink.write_event(&TraceEvent::Scvg(ScvgTrace {
        inuse_mb: 12,
        idle_mb: 13,
        sys_mb: 14,
        released_mb: 15,
        consumed_mb: 16,
    }))
    .unwrap();
    sink.write_line("plain passthrough").unwrap();

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], r#"{"kind":"gc","heap_mb":7}"#);
    assert_eq!(
        lines[1],
        r#"{"kind":"scvg","inuse_mb":12,"idle_mb":13,"sys_mb":14,"released_mb":15,"consumed_mb":16}"#
    );
    assert_eq!(lines[2], "plain passthrough");
}

#[test]
fn test_raw_event_json() {
    let event = TraceEvent::Raw {
        line: "INFO: \"quoted\"".to_string(),
    };

    let json = event_to_string(&event).unwrap();
    assert_eq!(json, r#"{"kind":"raw","line":"INFO: \"quoted\""}"#);
    assert_eq!(event_from_str(&json).unwrap(), event);
}

#[test]
fn test_event_from_invalid_json() {
    assert!(event_from_str("not json").is_err());
    assert!(event_from_str(r#"{"kind":"unknown"}"#).is_err());
}

#[test]
fn test_concurrent_writers_do_not_interleave() {
    let sink = Arc::new(EventSink::new(Vec::new()));

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let sink = sink.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    sink.write_event(&TraceEvent::Gc(GcTrace { heap_mb: worker * 1000 + i }))
                        .unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let sink = Arc::try_unwrap(sink).unwrap();
    let output = String::from_utf8(sink.into_inner()).unwrap();

    let events: Vec<TraceEvent> = output.lines().map(|l| event_from_str(l).unwrap()).collect();
    assert_eq!(events.len(), 1000);
}
