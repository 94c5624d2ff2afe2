//! Opcode classification used by the trace segmenter.
//!
//! Three pure, total functions: [`kind_of`] buckets an opcode into one of the eight behavioural
//! kinds, [`width_of`] says how many program-counter slots the instruction occupies, and
//! [`can_halt`] flags the instructions that unconditionally end the current scope.

use crate::Opcode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavioural kind of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Anything not listed below.
    Unclassified,
    /// Zero-argument environment reads (ADDRESS, CALLER, GAS, ...).
    ContextRead,
    /// One-argument reads (KECCAK256, BALANCE, CALLDATALOAD, ...).
    IndexedRead,
    /// SLOAD.
    StorageLoad,
    /// Single slot or word writes (SSTORE, MSTORE, MSTORE8).
    SingleWrite,
    /// Buffer copies into memory (CALLDATACOPY, CODECOPY, ...).
    RangeWrite,
    /// Scope-entering calls.
    CallLike,
    /// Scope-entering contract creation.
    CreateLike,
}

impl OpKind {
    /// Whether instructions of this kind are checked for a non-sequential predecessor.
    pub fn splits_on_discontinuity(&self) -> bool {
        matches!(self, OpKind::ContextRead | OpKind::CreateLike)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Unclassified => "unclassified",
            OpKind::ContextRead => "context-read",
            OpKind::IndexedRead => "indexed-read",
            OpKind::StorageLoad => "storage-load",
            OpKind::SingleWrite => "single-write",
            OpKind::RangeWrite => "range-write",
            OpKind::CallLike => "call-like",
            OpKind::CreateLike => "create-like",
        };
        f.pad(name)
    }
}

/// Maps an opcode to its [`OpKind`]. Unknown opcodes are [`OpKind::Unclassified`].
pub fn kind_of(op: Opcode) -> OpKind {
    use Opcode::*;

    match op {
        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
        | RETURNDATASIZE | COINBASE | TIMESTAMP | NUMBER | DIFFICULTY | GASLIMIT | PC | MSIZE
        | GAS => OpKind::ContextRead,
        KECCAK256 | BALANCE | CALLDATALOAD | EXTCODESIZE | BLOCKHASH => OpKind::IndexedRead,
        SLOAD => OpKind::StorageLoad,
        SSTORE | MSTORE | MSTORE8 => OpKind::SingleWrite,
        CALLDATACOPY | CODECOPY | EXTCODECOPY | RETURNDATACOPY => OpKind::RangeWrite,
        CALL | CALLCODE | DELEGATECALL | STATICCALL => OpKind::CallLike,
        CREATE | CREATE2 => OpKind::CreateLike,
        _ => OpKind::Unclassified,
    }
}

/// Number of program-counter positions the opcode and its immediate occupy (always >= 1).
pub fn width_of(op: Opcode) -> u64 {
    op.immediate_len() as u64 + 1
}

/// True for the instructions that unconditionally terminate the current execution scope.
pub fn can_halt(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::STOP | Opcode::REVERT | Opcode::SELFDESTRUCT | Opcode::RETURN
    )
}

impl Opcode {
    /// See [`kind_of`].
    pub fn kind(self) -> OpKind {
        kind_of(self)
    }

    /// See [`width_of`].
    pub fn width(self) -> u64 {
        width_of(self)
    }

    /// See [`can_halt`].
    pub fn can_halt(self) -> bool {
        can_halt(self)
    }
}
