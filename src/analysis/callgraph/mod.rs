//! Call graph construction and analysis.
//!
//! The call graph is built by decoding method bodies and collecting every `call`,
//! `callvirt` and `newobj` whose token resolves to a method. Nothing is executed.
//!
//! # Components
//!
//! - [`CallGraph`]: the graph itself, built assembly-wide or as a depth-bounded subgraph
//! - [`CallGraphNode`] / [`CallGraphEdge`]: a method and a "caller invokes callee" relation
//! - [`CallSite`] / [`call_sites`]: resolved call instructions of one decoded body
//!
//! # Example
//!
//! ```rust
//! use dotprobe::{
//!     analysis::callgraph::CallGraph,
//!     metadata::{loader::InMemoryAssembly, method::MethodDescriptor, token::Token},
//! };
//!
//! let mut assembly = InMemoryAssembly::new("Acme");
//! // call 0x06000001 (itself), ret
//! let spin = assembly.add_method(
//!     MethodDescriptor::new("Acme", "Acme.P", "Spin").with_token(Token::new(0x0600_0001)),
//!     vec![0x28, 0x01, 0x00, 0x00, 0x06, 0x2A],
//! );
//!
//! let graph = CallGraph::build_subgraph(&assembly, &spin, 4);
//! assert_eq!(graph.node_count(), 1);
//! assert_eq!(graph.recursive_methods().len(), 1);
//! ```

mod graph;
mod node;
mod site;

pub use graph::{CallGraph, CallGraphStats};
pub use node::{CallGraphEdge, CallGraphNode};
pub use site::{call_sites, CallKind, CallSite};
