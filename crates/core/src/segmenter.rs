/// Module reconstructing the control-flow structure of a single transaction from its recorded
/// execution trace.
///
/// The segmenter walks the ordered event sequence twice. The annotation pass assigns every
/// instruction the call index of the scope it executes in, counting program-counter-zero
/// re-entries. The segmentation pass tracks call depth and cuts the trace into basic blocks
/// wherever a new scope begins (program counter 0) or where a context read or contract creation
/// is reached without sequentially falling through from the previous instruction.
///
/// Every instruction records the block that owns it as a [`BlockId`], an index into the returned
/// block sequence. The index is rewritten whenever a block is split, so for every instruction
/// `x`, `blocks[x.block].ops` contains `x` exactly once.
use crate::codec::{hex_bytes, hex_quantity};
use crate::event::{Address, ExecutionEvent};
use crate::recorder::RecordedTrace;
use crate::{can_halt, width_of, Opcode};
use num_bigint::BigUint;
use scopetrace_utils::errors::{SegmentError, StopReason};
use serde::{Deserialize, Serialize};

/// Position of a block in the finalized block sequence.
pub type BlockId = usize;

/// An execution event enriched with its call depth and call-scope index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnnotatedInstruction {
    /// Program counter within the executing code.
    pub pc: u64,
    /// The executed opcode.
    pub op: Opcode,
    /// Gas remaining before the instruction.
    pub gas: u64,
    /// Gas cost of the instruction.
    pub cost: u64,
    /// Nesting level of call scopes.
    pub depth: u32,
    /// Identifier of the call scope the instruction executes in.
    pub call_index: u64,
    /// Returned bytes.
    #[serde(with = "hex_bytes")]
    pub ret: Vec<u8>,
    /// Transferred value, if known.
    #[serde(with = "hex_quantity")]
    pub value: Option<BigUint>,
    /// Block currently owning this instruction.
    #[serde(skip)]
    pub block: BlockId,
}

impl AnnotatedInstruction {
    fn from_event(event: ExecutionEvent, call_index: u64) -> Self {
        Self {
            pc: event.pc,
            op: event.op,
            gas: event.gas,
            cost: event.cost,
            depth: 0,
            call_index,
            ret: event.ret,
            value: event.value,
            block: 0,
        }
    }
}

/// A maximal contiguous run of executed instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BasicBlock {
    /// Global trace index of the first instruction.
    pub entry: u64,
    /// Global trace index of the last instruction.
    pub exit: u64,
    /// Owned instructions in execution order.
    pub ops: Vec<AnnotatedInstruction>,
    /// Contract address active when the block began. Always the zero address for now.
    pub address: Address,
    /// Position of this block in the finalized sequence.
    #[serde(skip)]
    pub id: BlockId,
}

impl BasicBlock {
    fn open(id: BlockId, entry: u64, exit: u64, address: Address) -> Self {
        Self {
            entry,
            exit,
            ops: Vec::new(),
            address,
            id,
        }
    }

    /// Moves every instruction from global position `at` onwards into a new block with id
    /// `new_id` and returns it. `self` keeps the prefix and ends at `at - 1`.
    ///
    /// `at` must lie strictly inside the block: after its first instruction and no later than
    /// its last one.
    pub fn split(&mut self, at: u64, new_id: BlockId) -> Result<BasicBlock, SegmentError> {
        let len = self.ops.len();
        let offset = at
            .checked_sub(self.entry)
            .map(|o| o as usize)
            .filter(|&o| o > 0 && o < len)
            .ok_or_else(|| {
                SegmentError::Structural(format!(
                    "split boundary {at} outside block {} (entry {}, {len} instructions)",
                    self.id, self.entry
                ))
            })?;

        let mut tail = BasicBlock::open(new_id, at, self.exit, self.address);
        tail.ops = self.ops.split_off(offset);
        self.exit = at - 1;

        for op in &mut self.ops {
            op.block = self.id;
        }
        for op in &mut tail.ops {
            op.block = new_id;
        }

        if self.ops.len() + tail.ops.len() != len {
            return Err(SegmentError::Structural(format!(
                "split of block {} lost instructions: {} + {} != {len}",
                self.id,
                self.ops.len(),
                tail.ops.len()
            )));
        }
        Ok(tail)
    }

    /// Number of instructions in the block.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the block holds no instruction.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Annotation pass: converts events into instructions carrying their call index.
///
/// The call index starts at 0 and is incremented before any instruction at program counter 0
/// other than the very first one.
pub fn annotate(events: Vec<ExecutionEvent>) -> Vec<AnnotatedInstruction> {
    let mut call_index = 0u64;
    events
        .into_iter()
        .enumerate()
        .map(|(i, event)| {
            if event.pc == 0 && i != 0 {
                call_index += 1;
            }
            AnnotatedInstruction::from_event(event, call_index)
        })
        .collect()
}

/// The fields of an instruction the continuation predicate looks at.
#[derive(Debug, Clone, Copy)]
struct Step {
    pc: u64,
    op: Opcode,
    call_index: u64,
}

/// Whether `next` is a direct sequential fallthrough from `prev`: same call scope, program
/// counter advanced by exactly the width of `prev`, and `prev` cannot halt the scope.
fn continues(prev: Step, next: Step) -> bool {
    prev.call_index == next.call_index
        && next.pc.wrapping_sub(prev.pc) == width_of(prev.op)
        && !can_halt(prev.op)
}

/// Segments a finished recording. See [`segment`].
pub fn segment_trace(trace: RecordedTrace) -> Result<Vec<BasicBlock>, SegmentError> {
    segment(trace.events, trace.stop)
}

/// Splits an ordered event sequence into basic blocks.
///
/// # Arguments
/// * `events` - The full trace of one transaction, in execution order.
/// * `stop` - The cancellation reason, if the recording was stopped.
///
/// # Returns
/// The blocks partitioning the trace, or [`SegmentError::Cancelled`] when `stop` is set. An
/// empty trace yields an empty block sequence.
pub fn segment(
    events: Vec<ExecutionEvent>,
    stop: Option<StopReason>,
) -> Result<Vec<BasicBlock>, SegmentError> {
    if let Some(reason) = stop {
        tracing::debug!("skipping segmentation, trace was cancelled: {reason}");
        return Err(SegmentError::Cancelled(reason));
    }
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let instructions = annotate(events);
    let total = instructions.len();
    tracing::debug!("Starting segmentation of {} instructions", total);

    let mut blocks: Vec<BasicBlock> = Vec::new();
    let mut current = BasicBlock::open(0, 0, total as u64 - 1, Address::ZERO);
    let mut depth: u32 = 0;
    let mut prev: Option<Step> = None;

    for (i, mut ins) in instructions.into_iter().enumerate() {
        let step = Step {
            pc: ins.pc,
            op: ins.op,
            call_index: ins.call_index,
        };
        ins.block = current.id;
        current.ops.push(ins);

        let boundary = if step.pc == 0 && i == 0 {
            depth = 1;
            false
        } else if step.pc == 0 {
            true
        } else if step.op.kind().splits_on_discontinuity() {
            // No predecessor at position 0, nothing to compare against.
            prev.is_some_and(|prev| !continues(prev, step))
        } else {
            false
        };

        if boundary {
            depth = depth.saturating_sub(1);
            let next = current.split(i as u64, blocks.len() + 1)?;
            tracing::trace!(
                "block {} closed at {}, new block opens at {} ({})",
                current.id,
                current.exit,
                i,
                step.op
            );
            blocks.push(std::mem::replace(&mut current, next));
        }

        if let Some(last) = current.ops.last_mut() {
            last.depth = depth;
            last.call_index = step.call_index;
        }
        prev = Some(step);
    }
    blocks.push(current);

    validate_blocks(&blocks, total)?;
    tracing::debug!("Split trace into {} blocks", blocks.len());
    Ok(blocks)
}

/// Checks that `blocks` partition a trace of `total` instructions.
///
/// Verifies contiguity of entry/exit indices, that every block's exit matches its instruction
/// count, that ids match positions, and that every instruction points back at its owner.
pub fn validate_blocks(blocks: &[BasicBlock], total: usize) -> Result<(), SegmentError> {
    let mut expected_entry = 0u64;
    for (idx, block) in blocks.iter().enumerate() {
        if block.id != idx {
            return Err(SegmentError::Structural(format!(
                "block at position {idx} has id {}",
                block.id
            )));
        }
        if block.is_empty() {
            return Err(SegmentError::Structural(format!("block {idx} is empty")));
        }
        if block.entry != expected_entry {
            return Err(SegmentError::Structural(format!(
                "block {idx} starts at {} instead of {expected_entry}",
                block.entry
            )));
        }
        if block.exit != block.entry + block.len() as u64 - 1 {
            return Err(SegmentError::Structural(format!(
                "block {idx} exit {} does not match {} instructions from {}",
                block.exit,
                block.len(),
                block.entry
            )));
        }
        if let Some(stray) = block.ops.iter().find(|op| op.block != idx) {
            return Err(SegmentError::Structural(format!(
                "instruction at pc {} in block {idx} points at block {}",
                stray.pc, stray.block
            )));
        }
        expected_entry = block.exit + 1;
    }

    if expected_entry != total as u64 {
        return Err(SegmentError::Structural(format!(
            "blocks cover {expected_entry} of {total} instructions"
        )));
    }
    Ok(())
}

/// Aggregate figures about a segmented trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSummary {
    /// Number of basic blocks.
    pub blocks: usize,
    /// Number of instructions across all blocks.
    pub instructions: usize,
    /// Number of distinct call scopes.
    pub call_scopes: u64,
    /// Deepest depth stamped on any instruction.
    pub max_depth: u32,
}

impl SegmentSummary {
    /// Summarizes a block sequence.
    pub fn of(blocks: &[BasicBlock]) -> Self {
        let ops = blocks.iter().flat_map(|b| b.ops.iter());
        let (instructions, last_call, max_depth) =
            ops.fold((0usize, None, 0u32), |(count, _, depth), op| {
                (count + 1, Some(op.call_index), depth.max(op.depth))
            });
        Self {
            blocks: blocks.len(),
            instructions,
            call_scopes: last_call.map_or(0, |c| c + 1),
            max_depth,
        }
    }
}
