//! Nodes and edges of a [`crate::analysis::callgraph::CallGraph`].

use std::sync::Arc;

use crate::{
    analysis::callgraph::CallKind,
    metadata::method::{MethodDescriptor, MethodId},
};

/// One method in a call graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CallGraphNode {
    /// Stable identity; unique within one graph
    pub id: MethodId,
    /// Human readable name
    pub display_name: String,
    /// Whether the method is declared outside the analyzed binary
    pub is_external: bool,
    /// Distance from the root in subgraph mode, `None` in assembly-wide mode
    pub depth: Option<usize>,
    /// The method itself
    pub method: Arc<MethodDescriptor>,
}

impl CallGraphNode {
    pub(crate) fn new(method: &Arc<MethodDescriptor>, is_external: bool, depth: Option<usize>) -> Self {
        CallGraphNode {
            id: method.id(),
            display_name: method.display_name(),
            is_external,
            depth,
            method: Arc::clone(method),
        }
    }
}

/// A "caller invokes callee" relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallGraphEdge<'g> {
    /// The calling method
    pub from: &'g MethodId,
    /// The called method
    pub to: &'g MethodId,
    /// How the call is made
    pub kind: CallKind,
}
