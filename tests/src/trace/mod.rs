mod cancellation;
mod properties;
mod scenarios;

use scopetrace_core::{ExecutionEvent, Opcode};

fn ev(pc: u64, op: Opcode) -> ExecutionEvent {
    ExecutionEvent::new(pc, op, 1_000_000, 3)
}
