use super::ev;
use scopetrace_core::assembler::assemble;
use scopetrace_core::{segment, Opcode};

#[test]
fn test_empty_trace() {
    let blocks = segment(Vec::new(), None).unwrap();
    assert!(blocks.is_empty());
    assert_eq!(assemble(Ok(blocks)).unwrap(), serde_json::json!([]));
}

#[test]
fn test_single_scope() {
    let blocks = segment(
        vec![
            ev(0, Opcode::PUSH(1)),
            ev(2, Opcode::PUSH(1)),
            ev(4, Opcode::ADD),
        ],
        None,
    )
    .unwrap();

    assert_eq!(blocks.len(), 1);
    assert_eq!((blocks[0].entry, blocks[0].exit), (0, 2));
    assert_eq!(blocks[0].len(), 3);
    assert!(blocks[0].ops.iter().all(|op| op.depth == 1));
    assert!(blocks[0].ops.iter().all(|op| op.call_index == 0));
}

#[test]
fn test_reentry_from_depth_zero() {
    let blocks = segment(vec![ev(5, Opcode::JUMPDEST), ev(0, Opcode::PUSH0)], None).unwrap();

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].exit, 0);
    assert_eq!(blocks[1].entry, 1);
    let (a, b) = (&blocks[0].ops[0], &blocks[1].ops[0]);
    assert_eq!(a.depth, 0);
    assert_eq!(b.depth, 0);
    assert_eq!(b.call_index, a.call_index + 1);
}

#[test]
fn test_reentry_decrements_depth() {
    let blocks = segment(
        vec![
            ev(0, Opcode::PUSH(1)),
            ev(2, Opcode::CALL),
            ev(0, Opcode::PUSH0),
        ],
        None,
    )
    .unwrap();

    assert_eq!(blocks.len(), 2);
    let a = blocks[0].ops.last().unwrap();
    let b = &blocks[1].ops[0];
    assert_eq!(a.depth, 1);
    assert_eq!(b.depth, 0);
    assert_eq!(b.call_index, a.call_index + 1);
}

#[test]
fn test_discontinuous_context_read_splits() {
    // PUSH9 at 0 is 10 bytes wide, so CALLER at 10 falls through.
    let blocks = segment(
        vec![
            ev(0, Opcode::PUSH(9)),
            ev(10, Opcode::CALLER),
            ev(50, Opcode::GAS),
        ],
        None,
    )
    .unwrap();

    assert_eq!(blocks.len(), 2);
    assert_eq!((blocks[0].entry, blocks[0].exit), (0, 1));
    assert_eq!(blocks[1].entry, 2);
    let a = &blocks[0].ops[1];
    let b = &blocks[1].ops[0];
    assert_eq!(a.depth, 1);
    assert_eq!(b.depth, a.depth - 1);
}

#[test]
fn test_discontinuous_plain_instruction_does_not_split() {
    let blocks = segment(
        vec![
            ev(0, Opcode::PUSH(9)),
            ev(10, Opcode::CALLER),
            ev(50, Opcode::ADD),
        ],
        None,
    )
    .unwrap();
    assert_eq!(blocks.len(), 1);
}

#[test]
fn test_context_read_after_halt_splits() {
    // Same scope and adjacent program counters, but STOP cannot fall through.
    let blocks = segment(
        vec![
            ev(0, Opcode::PUSH0),
            ev(1, Opcode::STOP),
            ev(2, Opcode::CALLER),
        ],
        None,
    )
    .unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].entry, 2);
}

#[test]
fn test_create_like_after_jump_splits() {
    let blocks = segment(
        vec![
            ev(0, Opcode::PUSH(1)),
            ev(2, Opcode::JUMP),
            ev(9, Opcode::CREATE2),
        ],
        None,
    )
    .unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].ops[0].op, Opcode::CREATE2);
}

#[test]
fn test_nested_calls_assembled() {
    let events = vec![
        ev(0, Opcode::PUSH(1)),
        ev(2, Opcode::CALL),
        ev(0, Opcode::CALLVALUE),
        ev(1, Opcode::RETURN),
        ev(3, Opcode::RETURNDATASIZE),
        ev(4, Opcode::POP),
        ev(5, Opcode::STOP),
    ];
    let json = assemble(segment(events, None)).unwrap();
    let blocks = json.as_array().unwrap();

    assert_eq!(blocks.len(), 3);
    let entries: Vec<u64> = blocks.iter().map(|b| b["Entry"].as_u64().unwrap()).collect();
    assert_eq!(entries, vec![0, 2, 4]);
    assert_eq!(blocks[1]["Ops"][0]["Op"], "CALLVALUE");
    assert_eq!(blocks[1]["Ops"][0]["CallIndex"], 1);
    // Returning to the caller does not revisit pc 0, so the call index stays put.
    assert_eq!(blocks[2]["Ops"][0]["CallIndex"], 1);
}
