//! VM instrumentation hooks.
//!
//! [`StepTracer`] mirrors the notifications an instrumented VM emits while running one
//! transaction. [`BlockTracer`] is the implementation that records steps and reconstructs basic
//! blocks once execution ends.

use crate::assembler;
use crate::config::TraceConfig;
use crate::event::{Address, ExecutionEvent};
use crate::recorder::{CancelHandle, EventRecorder};
use crate::segmenter::{segment_trace, BasicBlock, SegmentSummary};
use crate::Opcode;
use num_bigint::BigUint;
use scopetrace_utils::errors::{AssembleError, SegmentError, StopReason};

/// Notifications an instrumented VM delivers, in execution order, from its executing thread.
///
/// Only `capture_start`, `capture_state` and `stop` have to do anything; the remaining hooks
/// default to no-ops.
pub trait StepTracer {
    /// The outermost scope starts executing.
    fn capture_start(
        &mut self,
        from: Address,
        to: Address,
        create: bool,
        input: &[u8],
        gas: u64,
        value: Option<BigUint>,
    );

    /// One instruction is about to execute.
    fn capture_state(&mut self, pc: u64, op: Opcode, gas: u64, cost: u64, ret: &[u8]);

    /// A nested scope is entered via a call, create or self-destruct.
    fn capture_enter(
        &mut self,
        _op: Opcode,
        _from: Address,
        _to: Address,
        _input: &[u8],
        _gas: u64,
        _value: Option<BigUint>,
    ) {
    }

    /// A nested scope returned, even if it executed no code.
    fn capture_exit(&mut self, _output: &[u8], _gas_used: u64, _failed: bool) {}

    /// An instruction faulted.
    fn capture_fault(&mut self, _pc: u64, _op: Opcode, _gas: u64, _cost: u64, _depth: usize) {}

    /// The outermost scope finished.
    fn capture_end(&mut self, _output: &[u8], _gas_used: u64, _failed: bool) {}

    /// The transaction begins.
    fn capture_tx_start(&mut self, _gas_limit: u64) {}

    /// The transaction ends.
    fn capture_tx_end(&mut self, _rest_gas: u64) {}

    /// Stops tracing at the first opportune moment.
    fn stop(&mut self, reason: StopReason);
}

/// Records steps and segments them into basic blocks.
#[derive(Debug)]
pub struct BlockTracer {
    recorder: EventRecorder,
}

impl Default for BlockTracer {
    fn default() -> Self {
        Self::new(&TraceConfig::development())
    }
}

impl BlockTracer {
    /// Creates a tracer with the recorder settings of `config`.
    pub fn new(config: &TraceConfig) -> Self {
        Self {
            recorder: EventRecorder::with_config(config),
        }
    }

    /// A handle that can stop this tracer from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.recorder.cancel_handle()
    }

    /// The underlying recorder.
    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    /// Segments everything recorded so far.
    pub fn result(self) -> Result<Vec<BasicBlock>, SegmentError> {
        let blocks = segment_trace(self.recorder.finish())?;
        let summary = SegmentSummary::of(&blocks);
        tracing::debug!(
            blocks = summary.blocks,
            instructions = summary.instructions,
            call_scopes = summary.call_scopes,
            "trace segmented"
        );
        Ok(blocks)
    }

    /// Segments and assembles the recorded trace into its JSON form.
    pub fn json_result(self) -> Result<serde_json::Value, AssembleError> {
        assembler::assemble(self.result())
    }
}

impl StepTracer for BlockTracer {
    fn capture_start(
        &mut self,
        _from: Address,
        _to: Address,
        _create: bool,
        _input: &[u8],
        _gas: u64,
        _value: Option<BigUint>,
    ) {
        self.recorder.start();
    }

    fn capture_state(&mut self, pc: u64, op: Opcode, gas: u64, cost: u64, ret: &[u8]) {
        self.recorder.record(ExecutionEvent::new(pc, op, gas, cost).with_ret(ret));
    }

    fn stop(&mut self, reason: StopReason) {
        self.recorder.cancel(reason);
    }
}
