//! Adjacency-list directed graph.
//!
//! [`DirectedGraph`] stores node and edge payloads in insertion order and keeps per-node
//! outgoing and incoming edge lists, so both successor and predecessor walks are cheap.
//! Nodes are never removed, which keeps [`NodeId`]s stable for the lifetime of the graph.

use std::fmt;

use crate::{Error, Result};

/// Index of a node inside one [`DirectedGraph`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Wraps a raw node index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// The raw node index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct EdgeData<E> {
    source: NodeId,
    target: NodeId,
    data: E,
}

/// A directed multigraph with node payloads `N` and edge payloads `E`.
#[derive(Debug, Clone)]
pub struct DirectedGraph<N, E> {
    nodes: Vec<N>,
    edges: Vec<EdgeData<E>>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl<N, E> Default for DirectedGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DirectedGraph<N, E> {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Adds a node and returns its id.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Adds an edge between two existing nodes.
    ///
    /// # Errors
    /// Returns [`Error::GraphError`] if either endpoint is not part of this graph.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, data: E) -> Result<()> {
        for (role, node) in [("source", source), ("target", target)] {
            if node.index() >= self.nodes.len() {
                return Err(Error::GraphError(format!(
                    "{} node {} does not exist in graph with {} nodes",
                    role,
                    node,
                    self.nodes.len()
                )));
            }
        }

        let index = self.edges.len();
        self.edges.push(EdgeData {
            source,
            target,
            data,
        });
        self.outgoing[source.index()].push(index);
        self.incoming[target.index()].push(index);
        Ok(())
    }

    /// The payload of a node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All nodes with their ids, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, data)| (NodeId::new(i), data))
    }

    /// All edges as `(source, target, payload)`, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &E)> + '_ {
        self.edges.iter().map(|e| (e.source, e.target, &e.data))
    }

    /// Targets of the outgoing edges of `node`. Empty for unknown nodes.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| self.edges[edge].target)
    }

    /// Sources of the incoming edges of `node`. Empty for unknown nodes.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| self.edges[edge].source)
    }

    /// Outgoing edges of `node` as `(target, payload)`.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &E)> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| (self.edges[edge].target, &self.edges[edge].data))
    }

    /// Nodes without incoming edges.
    pub fn entry_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming
            .iter()
            .enumerate()
            .filter(|(_, edges)| edges.is_empty())
            .map(|(i, _)| NodeId::new(i))
    }

    /// Nodes without outgoing edges.
    pub fn exit_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing
            .iter()
            .enumerate()
            .filter(|(_, edges)| edges.is_empty())
            .map(|(i, _)| NodeId::new(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_walk() {
        let mut graph: DirectedGraph<&str, u8> = DirectedGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");

        graph.add_edge(a, b, 1).unwrap();
        graph.add_edge(a, c, 2).unwrap();
        graph.add_edge(b, c, 3).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.node(b), Some(&"b"));
        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(graph.predecessors(c).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(graph.entry_nodes().collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.exit_nodes().collect::<Vec<_>>(), vec![c]);
        assert_eq!(
            graph.outgoing_edges(b).collect::<Vec<_>>(),
            vec![(c, &3)]
        );
    }

    #[test]
    fn rejects_dangling_edges() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::default();
        let a = graph.add_node(());

        let err = graph.add_edge(a, NodeId::new(7), ()).unwrap_err();
        assert!(matches!(err, Error::GraphError(ref msg) if msg.contains("target")));
        assert!(graph.add_edge(NodeId::new(3), a, ()).is_err());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn unknown_nodes_have_no_neighbours() {
        let graph: DirectedGraph<(), ()> = DirectedGraph::new();
        assert_eq!(graph.successors(NodeId::new(0)).count(), 0);
        assert_eq!(graph.predecessors(NodeId::new(5)).count(), 0);
        assert!(graph.node(NodeId::new(0)).is_none());
    }

    #[test]
    fn node_id_formatting() {
        assert_eq!(format!("{}", NodeId::new(4)), "n4");
        assert_eq!(format!("{:?}", NodeId::new(4)), "NodeId(4)");
    }
}
