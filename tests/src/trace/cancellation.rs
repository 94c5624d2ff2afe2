use super::ev;
use scopetrace_core::assembler;
use scopetrace_core::config::TraceConfig;
use scopetrace_core::{
    segment_trace, Address, BlockTracer, EventRecorder, Opcode, StepTracer,
};
use scopetrace_utils::errors::{AssembleError, SegmentError, StopReason};
use std::time::Duration;

#[test]
fn test_cancel_before_any_event() {
    let mut recorder = EventRecorder::new();
    recorder.cancel(StopReason::Aborted("shutdown".into()));
    recorder.start();
    for pc in 0..10 {
        recorder.record(ev(pc, Opcode::JUMPDEST));
    }

    assert!(recorder.is_empty());
    assert_eq!(recorder.dropped(), 10);
    let result = segment_trace(recorder.finish());
    assert!(matches!(
        result,
        Err(SegmentError::Cancelled(StopReason::Aborted(ref msg))) if msg == "shutdown"
    ));
}

#[test]
fn test_cancel_midway_discards_partial_blocks() {
    let mut recorder = EventRecorder::new();
    recorder.start();
    recorder.record(ev(0, Opcode::PUSH0));
    recorder.record(ev(1, Opcode::ADD));
    recorder.cancel(StopReason::Timeout(Duration::from_secs(5)));
    recorder.record(ev(2, Opcode::STOP));

    let trace = recorder.finish();
    assert_eq!(trace.events.len(), 2);
    match assembler::assemble(segment_trace(trace)) {
        Err(AssembleError::Stopped(reason)) => {
            assert_eq!(reason.to_string(), "execution timeout after 5s");
        }
        other => panic!("expected a stop, got {other:?}"),
    }
}

#[test]
fn test_first_reason_wins() {
    let recorder = EventRecorder::new();
    let handle = recorder.cancel_handle();
    handle.cancel(StopReason::StepLimit(3));
    recorder.cancel(StopReason::Aborted("late".into()));
    assert_eq!(handle.reason(), Some(StopReason::StepLimit(3)));
}

#[test]
fn test_step_limit_cancels() {
    let config = TraceConfig {
        max_steps: Some(2),
        ..TraceConfig::development()
    };
    let mut recorder = EventRecorder::with_config(&config);
    recorder.start();
    for pc in 0..5 {
        recorder.record(ev(pc, Opcode::JUMPDEST));
    }
    assert_eq!(recorder.len(), 2);
    assert!(matches!(
        segment_trace(recorder.finish()),
        Err(SegmentError::Cancelled(StopReason::StepLimit(2)))
    ));
}

#[test]
fn test_cancel_from_another_thread() {
    let mut recorder = EventRecorder::new();
    recorder.start();
    let handle = recorder.cancel_handle();

    std::thread::spawn(move || handle.cancel(StopReason::Aborted("supervisor".into())))
        .join()
        .unwrap();

    recorder.record(ev(0, Opcode::PUSH0));
    assert!(recorder.is_cancelled());
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_timeout_watchdog_stops_tracer() {
    let mut tracer = BlockTracer::new(&TraceConfig::development());
    let handle = tracer.cancel_handle();
    let timeout = Duration::from_millis(10);
    let watchdog = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        handle.cancel(StopReason::Timeout(timeout));
    });

    tracer.capture_start(Address::ZERO, Address::ZERO, false, &[], 100, None);
    tracer.capture_state(0, Opcode::PUSH0, 100, 2, &[]);
    watchdog.await.unwrap();
    tracer.capture_state(1, Opcode::STOP, 98, 0, &[]);

    assert_eq!(tracer.recorder().len(), 1);
    assert!(matches!(
        tracer.json_result(),
        Err(AssembleError::Stopped(StopReason::Timeout(t))) if t == timeout
    ));
}
