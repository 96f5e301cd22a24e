//! Generic directed graph used by the call graph.

pub mod algorithms;
mod directed;

pub use directed::{DirectedGraph, NodeId};
