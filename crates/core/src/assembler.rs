//! Turns a segmentation result into the JSON consumed by downstream analysis.
//!
//! A successful result becomes an array of blocks (`Entry`, `Exit`, `Ops`, `Address`), each
//! instruction carrying `Pc`, `Op`, `Gas`, `Cost`, `Depth`, `CallIndex`, `Ret` and `Value`.
//! A cancelled result becomes an [`AssembleError::Stopped`] carrying the stop reason; no partial
//! block array is ever emitted.

use crate::segmenter::BasicBlock;
use scopetrace_utils::errors::{AssembleError, SegmentError};
use serde_json::Value;

/// Serializes the block sequence, or converts the segmentation failure.
pub fn assemble(result: Result<Vec<BasicBlock>, SegmentError>) -> Result<Value, AssembleError> {
    let blocks = result?;
    Ok(serde_json::to_value(&blocks)?)
}

/// Like [`assemble`], rendered as compact JSON text.
pub fn to_json_string(result: Result<Vec<BasicBlock>, SegmentError>) -> Result<String, AssembleError> {
    let blocks = result?;
    Ok(serde_json::to_string(&blocks)?)
}

/// Like [`assemble`], rendered as indented JSON text.
pub fn to_json_pretty(result: Result<Vec<BasicBlock>, SegmentError>) -> Result<String, AssembleError> {
    let blocks = result?;
    Ok(serde_json::to_string_pretty(&blocks)?)
}
