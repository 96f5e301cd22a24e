//! Static analysis of decoded method bodies.
//!
//! - [`callgraph`] - which methods call which, assembly-wide or rooted at one method
//! - [`decompiler`] - the seam to an external decompiler

pub mod callgraph;
pub mod decompiler;

pub use callgraph::{CallGraph, CallGraphEdge, CallGraphNode, CallGraphStats, CallKind};
pub use decompiler::{decompile_or_comment, Decompiler};
