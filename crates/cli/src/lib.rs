//! Command implementations for the `scopetrace` binary.

pub mod commands;
