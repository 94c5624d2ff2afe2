//! Buffers the per-step events of one VM execution.
//!
//! The recorder is owned by the thread interpreting instructions. Cancellation can be requested
//! from anywhere through a [`CancelHandle`]: the handle stores the stop reason once and then
//! raises an atomic flag, and every [`EventRecorder::record`] call checks that flag before
//! touching the buffer, so no event is appended after cancellation has been observed.

use crate::config::TraceConfig;
use crate::event::ExecutionEvent;
use scopetrace_utils::errors::StopReason;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Default)]
struct CancelState {
    interrupted: AtomicBool,
    reason: OnceLock<StopReason>,
}

/// Cloneable handle used to stop a recording from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Requests cancellation. The first reason wins; later calls are no-ops. Never blocks.
    pub fn cancel(&self, reason: StopReason) {
        if self.state.reason.set(reason).is_ok() {
            if let Some(reason) = self.state.reason.get() {
                tracing::debug!("recording cancelled: {reason}");
            }
        }
        self.state.interrupted.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.interrupted.load(Ordering::Acquire)
    }

    /// The stored stop reason, once cancellation is visible.
    pub fn reason(&self) -> Option<StopReason> {
        if self.is_cancelled() {
            self.state.reason.get().cloned()
        } else {
            None
        }
    }
}

/// Everything the segmenter needs from a finished recording.
#[derive(Debug, Clone, Default)]
pub struct RecordedTrace {
    /// Events in execution order.
    pub events: Vec<ExecutionEvent>,
    /// Set when the recording was cancelled.
    pub stop: Option<StopReason>,
}

/// Accumulates [`ExecutionEvent`]s in execution order.
#[derive(Debug)]
pub struct EventRecorder {
    events: Vec<ExecutionEvent>,
    cancel: CancelHandle,
    dropped: usize,
    capture_return_data: bool,
    max_steps: Option<usize>,
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRecorder {
    /// Creates an unbounded recorder that keeps returned bytes.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            cancel: CancelHandle::default(),
            dropped: 0,
            capture_return_data: true,
            max_steps: None,
        }
    }

    /// Creates a recorder honouring the buffer hint, return-data capture and step limit of
    /// `config`. The timeout is enforced by whoever holds the [`CancelHandle`].
    pub fn with_config(config: &TraceConfig) -> Self {
        Self {
            events: Vec::with_capacity(config.capacity_hint),
            capture_return_data: config.capture_return_data,
            max_steps: config.max_steps,
            ..Self::new()
        }
    }

    /// Clears the buffered events for a new execution.
    ///
    /// Cancellation is one-shot: a request made before `start` stays in effect.
    pub fn start(&mut self) {
        tracing::debug!("recorder reset ({} events discarded)", self.events.len());
        self.events.clear();
        self.dropped = 0;
    }

    /// Appends one event, or silently drops it if cancellation was requested.
    pub fn record(&mut self, mut event: ExecutionEvent) {
        if self.cancel.is_cancelled() {
            if self.dropped == 0 {
                tracing::debug!("dropping events after cancellation");
            }
            self.dropped += 1;
            return;
        }

        if let Some(limit) = self.max_steps {
            if self.events.len() >= limit {
                self.cancel.cancel(StopReason::StepLimit(limit));
                self.dropped += 1;
                return;
            }
        }

        if !self.capture_return_data {
            event.ret.clear();
        }
        self.events.push(event);
    }

    /// Requests cancellation, see [`CancelHandle::cancel`].
    pub fn cancel(&self, reason: StopReason) {
        self.cancel.cancel(reason);
    }

    /// A handle that can cancel this recorder from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Recorded events so far.
    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    /// Number of events dropped because of cancellation.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hands the buffer and the stop reason (if any) over for segmentation.
    pub fn finish(self) -> RecordedTrace {
        let stop = self.cancel.reason();
        RecordedTrace {
            events: self.events,
            stop,
        }
    }
}
