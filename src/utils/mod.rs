//! Shared helpers that are not specific to CIL.

pub mod dot;
pub mod graph;
