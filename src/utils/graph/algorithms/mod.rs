//! Graph algorithms over [`crate::utils::graph::DirectedGraph`].

mod scc;

pub use scc::strongly_connected_components;
