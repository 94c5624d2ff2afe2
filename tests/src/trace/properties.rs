use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scopetrace_core::{segment, BasicBlock, ExecutionEvent, Opcode};

const POOL: &[Opcode] = &[
    Opcode::ADD,
    Opcode::PUSH0,
    Opcode::PUSH(1),
    Opcode::PUSH(32),
    Opcode::CALLER,
    Opcode::GAS,
    Opcode::CALLVALUE,
    Opcode::SLOAD,
    Opcode::SSTORE,
    Opcode::MSTORE,
    Opcode::CALLDATACOPY,
    Opcode::CALL,
    Opcode::CREATE,
    Opcode::JUMP,
    Opcode::JUMPDEST,
    Opcode::STOP,
    Opcode::RETURN,
    Opcode::REVERT,
];

/// A trace mixing fallthroughs, jumps and re-entries at program counter 0.
fn random_trace(rng: &mut StdRng, len: usize) -> Vec<ExecutionEvent> {
    let mut pc = 0u64;
    (0..len)
        .map(|i| {
            if i > 0 && rng.random_bool(0.1) {
                pc = 0;
            } else if i > 0 && rng.random_bool(0.2) {
                pc = rng.random_range(1..200);
            }
            let op = POOL[rng.random_range(0..POOL.len())];
            let gas = rng.random_range(0..1_000_000);
            let event = ExecutionEvent::new(pc, op, gas, 3);
            pc += op.width();
            event
        })
        .collect()
}

fn check_partition(events: &[ExecutionEvent], blocks: &[BasicBlock]) {
    let flat: Vec<(u64, Opcode, u64)> = blocks
        .iter()
        .flat_map(|b| b.ops.iter())
        .map(|op| (op.pc, op.op, op.gas))
        .collect();
    let original: Vec<(u64, Opcode, u64)> =
        events.iter().map(|e| (e.pc, e.op, e.gas)).collect();
    assert_eq!(flat, original);
}

fn check_contiguity(blocks: &[BasicBlock], total: usize) {
    assert_eq!(blocks[0].entry, 0);
    assert_eq!(blocks[blocks.len() - 1].exit, total as u64 - 1);
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].exit + 1, pair[1].entry);
    }
    for (idx, block) in blocks.iter().enumerate() {
        assert!(!block.is_empty());
        assert!(block.ops.iter().all(|op| op.block == idx));
    }
}

fn check_call_indices(events: &[ExecutionEvent], blocks: &[BasicBlock]) {
    let indices: Vec<u64> = blocks
        .iter()
        .flat_map(|b| b.ops.iter())
        .map(|op| op.call_index)
        .collect();
    let mut expected = 0u64;
    for (i, (event, index)) in events.iter().zip(&indices).enumerate() {
        if i > 0 && event.pc == 0 {
            expected += 1;
        }
        assert_eq!(*index, expected, "call index at position {i}");
    }
}

#[test]
fn test_random_traces_hold_invariants() {
    let mut rng = StdRng::seed_from_u64(42);
    for round in 0..200 {
        let len = rng.random_range(1..120);
        let events = random_trace(&mut rng, len);
        let blocks = segment(events.clone(), None)
            .unwrap_or_else(|e| panic!("round {round} failed: {e}"));

        check_partition(&events, &blocks);
        check_contiguity(&blocks, events.len());
        check_call_indices(&events, &blocks);

        // Every re-entry opens a new block.
        for (i, event) in events.iter().enumerate().skip(1) {
            if event.pc == 0 {
                assert!(blocks.iter().any(|b| b.entry == i as u64));
            }
        }
    }
}

#[test]
fn test_depth_never_underflows() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        // Mostly re-entries, which drive depth down repeatedly.
        let events: Vec<ExecutionEvent> = (0..64)
            .map(|_| {
                let pc = if rng.random_bool(0.7) { 0 } else { 1 };
                ExecutionEvent::new(pc, Opcode::CALLER, 10, 2)
            })
            .collect();
        let blocks = segment(events, None).unwrap();
        let depths: Vec<u32> = blocks
            .iter()
            .flat_map(|b| b.ops.iter())
            .map(|op| op.depth)
            .collect();
        assert!(depths.iter().all(|&d| d <= 1));
        assert!(depths.windows(2).all(|w| w[1] <= w[0]));
    }
}
