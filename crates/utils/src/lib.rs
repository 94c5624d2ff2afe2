//! Shared error types for the scopetrace crates.

pub mod errors;
