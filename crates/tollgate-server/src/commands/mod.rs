//! CLI command implementations for the `tollgate` binary.

pub mod keys;
pub mod serve;
