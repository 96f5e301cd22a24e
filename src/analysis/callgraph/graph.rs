//! Call graph construction and queries.
//!
//! [`CallGraph`] maps which methods call which, inferred from `call`, `callvirt` and `newobj`
//! instructions. It is built in one of two modes:
//!
//! - [`CallGraph::build_assembly`] decodes every method body of one binary and keeps only
//!   calls whose target is declared in that same binary. Calls into the framework or other
//!   libraries are invisible, keeping the graph scoped to the analyzed logic.
//! - [`CallGraph::build_subgraph`] walks breadth-first from one root method up to a depth
//!   bound and keeps every call regardless of where the target is declared.
//!
//! Neither mode executes anything. Both decode bodies on demand and drop them again.
//!
//! The graph sits on top of the generic [`DirectedGraph`] and uses its strongly connected
//! component analysis for recursion detection.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt::Write,
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    analysis::callgraph::{call_sites, CallGraphEdge, CallGraphNode, CallKind},
    assembly::{decode_body, Truncation},
    metadata::{
        loader::AssemblyView,
        method::{MethodDescriptor, MethodId},
    },
    utils::{
        dot::escape_dot,
        graph::{algorithms::strongly_connected_components, DirectedGraph, NodeId},
    },
};

/// A directed graph of methods and the calls between them.
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DirectedGraph<CallGraphNode, CallKind>,
    index: HashMap<MethodId, NodeId>,
    edge_set: HashSet<(NodeId, NodeId, CallKind)>,
    root: Option<NodeId>,
    truncated: Vec<(MethodId, Truncation)>,
}

/// Summary numbers of a [`CallGraph`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraphStats {
    /// Number of methods (nodes)
    pub method_count: usize,
    /// Number of distinct call edges
    pub edge_count: usize,
    /// Nodes declared outside the analyzed binary
    pub external_methods: usize,
    /// Nodes nothing calls
    pub entry_points: usize,
    /// Nodes that call nothing
    pub leaf_methods: usize,
    /// Nodes taking part in direct or mutual recursion
    pub recursive_methods: usize,
    /// Bodies that could not be decoded completely
    pub truncated_bodies: usize,
}

impl CallGraph {
    /// Builds the assembly-wide call graph of `view`.
    ///
    /// Every method of the binary becomes a node. Bodies are decoded in parallel. An edge is
    /// added only if the called method is declared in the binary itself.
    ///
    /// ```rust
    /// use dotprobe::{
    ///     analysis::callgraph::CallGraph,
    ///     metadata::{loader::InMemoryAssembly, method::MethodDescriptor, token::Token},
    /// };
    ///
    /// let mut assembly = InMemoryAssembly::new("Acme");
    /// assembly.add_method(
    ///     MethodDescriptor::new("Acme", "Acme.P", "Helper").with_token(Token::new(0x0600_0002)),
    ///     vec![0x2A],
    /// );
    /// // call Helper, ret
    /// assembly.add_method(
    ///     MethodDescriptor::new("Acme", "Acme.P", "Main"),
    ///     vec![0x28, 0x02, 0x00, 0x00, 0x06, 0x2A],
    /// );
    ///
    /// let graph = CallGraph::build_assembly(&assembly);
    /// assert_eq!(graph.node_count(), 2);
    /// assert_eq!(graph.edge_count(), 1);
    /// ```
    pub fn build_assembly<V: AssemblyView + ?Sized>(view: &V) -> Self {
        let methods = view.methods();
        let assembly = view.name();

        let decoded: Vec<_> = methods
            .par_iter()
            .map(|method| {
                let body = view.method_body(method);
                let decoded = body.map(|code| decode_body(&code, view));
                (method, decoded)
            })
            .collect();

        let mut graph = CallGraph::default();
        for method in &methods {
            graph.ensure_node(method, false, None);
        }

        for (method, decoded) in decoded {
            let Some(decoded) = decoded else {
                continue;
            };
            let caller = graph.ensure_node(method, false, None);
            if let Some(truncation) = decoded.truncation {
                graph.note_truncation(method, truncation);
            }

            for site in call_sites(&decoded.instructions) {
                if site.target.assembly != assembly {
                    continue;
                }
                let callee = graph.ensure_node(&site.target, false, None);
                graph.add_call(caller, callee, site.kind);
            }
        }

        log::debug!(
            "assembly-wide call graph of {}: {} methods, {} calls",
            assembly,
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Builds the call graph reachable from `root` within `max_depth` calls.
    ///
    /// Traversal is breadth-first, so every node's recorded depth is its shortest call
    /// distance from the root. Nodes at `max_depth` are added but not expanded; with a depth
    /// of zero the graph holds the root alone. Methods whose body the loader cannot supply
    /// are leaves.
    pub fn build_subgraph<V: AssemblyView + ?Sized>(
        view: &V,
        root: &Arc<MethodDescriptor>,
        max_depth: usize,
    ) -> Self {
        let assembly = view.name();
        let mut graph = CallGraph::default();

        let root_node = graph.ensure_node(root, root.assembly != assembly, Some(0));
        graph.root = Some(root_node);

        let mut queue = VecDeque::from([(Arc::clone(root), root_node, 0usize)]);
        while let Some((method, caller, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(code) = view.method_body(&method) else {
                continue;
            };

            let decoded = decode_body(&code, view);
            if let Some(truncation) = decoded.truncation {
                graph.note_truncation(&method, truncation);
            }

            for site in call_sites(&decoded.instructions) {
                let seen = graph.index.contains_key(&site.target.id());
                let callee = graph.ensure_node(
                    &site.target,
                    site.target.assembly != assembly,
                    Some(depth + 1),
                );
                graph.add_call(caller, callee, site.kind);

                if !seen {
                    queue.push_back((site.target, callee, depth + 1));
                }
            }
        }

        log::debug!(
            "call subgraph of {} (depth {}): {} methods, {} calls",
            root.display_name(),
            max_depth,
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    fn ensure_node(
        &mut self,
        method: &Arc<MethodDescriptor>,
        is_external: bool,
        depth: Option<usize>,
    ) -> NodeId {
        let id = method.id();
        if let Some(&node) = self.index.get(&id) {
            return node;
        }

        let node = self
            .graph
            .add_node(CallGraphNode::new(method, is_external, depth));
        self.index.insert(id, node);
        node
    }

    fn add_call(&mut self, caller: NodeId, callee: NodeId, kind: CallKind) {
        if !self.edge_set.insert((caller, callee, kind)) {
            return;
        }
        if let Err(error) = self.graph.add_edge(caller, callee, kind) {
            log::warn!("dropping call edge: {error}");
        }
    }

    fn note_truncation(&mut self, method: &MethodDescriptor, truncation: Truncation) {
        log::warn!(
            "body of {} decoded only up to IL_{:04x}: {}",
            method.display_name(),
            truncation.offset,
            truncation.reason
        );
        self.truncated.push((method.id(), truncation));
    }

    /// The root method in subgraph mode.
    #[must_use]
    pub fn root(&self) -> Option<&CallGraphNode> {
        self.root.and_then(|node| self.graph.node(node))
    }

    /// Number of methods in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct call edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the method is part of the graph.
    #[must_use]
    pub fn contains(&self, id: &MethodId) -> bool {
        self.index.contains_key(id)
    }

    /// The node of a method.
    #[must_use]
    pub fn node(&self, id: &MethodId) -> Option<&CallGraphNode> {
        self.index.get(id).and_then(|&node| self.graph.node(node))
    }

    /// All nodes, in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &CallGraphNode> + '_ {
        self.graph.nodes().map(|(_, node)| node)
    }

    /// All edges, in discovery order.
    pub fn edges(&self) -> impl Iterator<Item = CallGraphEdge<'_>> + '_ {
        self.graph.edges().filter_map(|(from, to, kind)| {
            Some(CallGraphEdge {
                from: &self.graph.node(from)?.id,
                to: &self.graph.node(to)?.id,
                kind: *kind,
            })
        })
    }

    /// Methods called by `id`, each listed once.
    #[must_use]
    pub fn callees(&self, id: &MethodId) -> Vec<&CallGraphNode> {
        match self.index.get(id) {
            Some(&node) => self.distinct_nodes(self.graph.successors(node)),
            None => Vec::new(),
        }
    }

    /// Methods calling `id`, each listed once.
    #[must_use]
    pub fn callers(&self, id: &MethodId) -> Vec<&CallGraphNode> {
        match self.index.get(id) {
            Some(&node) => self.distinct_nodes(self.graph.predecessors(node)),
            None => Vec::new(),
        }
    }

    fn distinct_nodes(&self, nodes: impl Iterator<Item = NodeId>) -> Vec<&CallGraphNode> {
        let mut seen = HashSet::new();
        nodes
            .filter(|node| seen.insert(*node))
            .filter_map(|node| self.graph.node(node))
            .collect()
    }

    /// Methods nothing in the graph calls.
    #[must_use]
    pub fn entry_points(&self) -> Vec<&CallGraphNode> {
        self.graph
            .entry_nodes()
            .filter_map(|node| self.graph.node(node))
            .collect()
    }

    /// Methods that call nothing in the graph.
    #[must_use]
    pub fn leaf_methods(&self) -> Vec<&CallGraphNode> {
        self.graph
            .exit_nodes()
            .filter_map(|node| self.graph.node(node))
            .collect()
    }

    /// Methods that can reach themselves: self-recursive methods and members of mutual
    /// recursion cycles.
    #[must_use]
    pub fn recursive_methods(&self) -> Vec<&CallGraphNode> {
        let mut recursive: Vec<NodeId> = Vec::new();
        for scc in strongly_connected_components(&self.graph) {
            match scc.as_slice() {
                [single] => {
                    if self.graph.successors(*single).any(|s| s == *single) {
                        recursive.push(*single);
                    }
                }
                nodes => recursive.extend_from_slice(nodes),
            }
        }

        recursive.sort_unstable();
        recursive
            .into_iter()
            .filter_map(|node| self.graph.node(node))
            .collect()
    }

    /// Bodies that decoded only partially, with where decoding stopped.
    #[must_use]
    pub fn truncated_bodies(&self) -> &[(MethodId, Truncation)] {
        &self.truncated
    }

    /// Summary numbers.
    #[must_use]
    pub fn stats(&self) -> CallGraphStats {
        CallGraphStats {
            method_count: self.node_count(),
            edge_count: self.edge_count(),
            external_methods: self.nodes().filter(|n| n.is_external).count(),
            entry_points: self.graph.entry_nodes().count(),
            leaf_methods: self.graph.exit_nodes().count(),
            recursive_methods: self.recursive_methods().len(),
            truncated_bodies: self.truncated.len(),
        }
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// External methods are filled yellow, the root (or, without a root, every entry point)
    /// green and leaves blue. Edge labels name the call kind.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CallGraph {\n");
        let _ = writeln!(
            dot,
            "    label=\"{}\";",
            escape_dot(title.unwrap_or("Call Graph"))
        );
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
        dot.push_str("    edge [fontname=\"Courier\", fontsize=9];\n");
        dot.push_str("    rankdir=TB;\n\n");

        let entries: HashSet<NodeId> = match self.root {
            Some(root) => HashSet::from([root]),
            None => self.graph.entry_nodes().collect(),
        };
        let leaves: HashSet<NodeId> = self.graph.exit_nodes().collect();

        for (node_id, node) in self.graph.nodes() {
            let style = if node.is_external {
                ", style=filled, fillcolor=lightyellow"
            } else if entries.contains(&node_id) {
                ", style=filled, fillcolor=lightgreen"
            } else if leaves.contains(&node_id) {
                ", style=filled, fillcolor=lightblue"
            } else {
                ""
            };

            let _ = writeln!(
                dot,
                "    {node_id} [label=\"{}\"{style}];",
                escape_dot(&node.display_name)
            );
        }

        dot.push('\n');
        for (from, to, kind) in self.graph.edges() {
            let _ = writeln!(dot, "    {from} -> {to} [label=\"{kind}\"];");
        }

        dot.push_str("}\n");
        dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{loader::InMemoryAssembly, token::Token};

    fn call(token: u32) -> Vec<u8> {
        let mut code = vec![0x28];
        code.extend_from_slice(&token.to_le_bytes());
        code
    }

    fn newobj(token: u32) -> Vec<u8> {
        let mut code = vec![0x73];
        code.extend_from_slice(&token.to_le_bytes());
        code
    }

    fn body(parts: &[Vec<u8>]) -> Vec<u8> {
        let mut code: Vec<u8> = parts.concat();
        code.push(0x2A);
        code
    }

    fn method(name: &str, row: u32) -> MethodDescriptor {
        MethodDescriptor::new("Acme", "Acme.P", name).with_token(Token::new(0x0600_0000 | row))
    }

    /// Main -> A -> B -> C, A -> A, B <-> D, Main -> Console.WriteLine (external)
    fn fixture() -> (InMemoryAssembly, Arc<MethodDescriptor>) {
        let mut assembly = InMemoryAssembly::new("Acme");
        assembly.add_external_method(
            Token::new(0x0A00_0001),
            MethodDescriptor::new("mscorlib", "System.Console", "WriteLine"),
        );

        let main = assembly.add_method(
            method("Main", 1),
            body(&[call(0x0600_0002), call(0x0A00_0001), call(0x0600_0002)]),
        );
        assembly.add_method(method("A", 2), body(&[call(0x0600_0003), call(0x0600_0002)]));
        assembly.add_method(method("B", 3), body(&[call(0x0600_0004), call(0x0600_0005)]));
        assembly.add_method(method("C", 4), body(&[]));
        assembly.add_method(method("D", 5), body(&[call(0x0600_0003)]));

        (assembly, main)
    }

    fn id(name: &str, row: u32) -> MethodId {
        method(name, row).id()
    }

    #[test]
    fn assembly_mode_filters_external_calls() {
        let (assembly, _) = fixture();
        let graph = CallGraph::build_assembly(&assembly);

        assert_eq!(graph.node_count(), 5);
        assert!(graph.nodes().all(|n| !n.is_external && n.depth.is_none()));
        assert!(graph.edges().all(|e| graph.node(e.to).is_some_and(|n| n.method.assembly == "Acme")));
        assert!(graph.root().is_none());

        // Main->A, A->B, A->A, B->C, B->D, D->B (Main->A only once)
        assert_eq!(graph.edge_count(), 6);
        let main_callees: Vec<_> = graph
            .callees(&id("Main", 1))
            .into_iter()
            .map(|n| n.method.name.clone())
            .collect();
        assert_eq!(main_callees, ["A"]);
    }

    #[test]
    fn queries() {
        let (assembly, _) = fixture();
        let graph = CallGraph::build_assembly(&assembly);

        let callers: Vec<_> = graph
            .callers(&id("B", 3))
            .into_iter()
            .map(|n| n.method.name.as_str())
            .collect();
        assert_eq!(callers, ["A", "D"]);

        let entries: Vec<_> = graph.entry_points().into_iter().map(|n| n.method.name.as_str()).collect();
        assert_eq!(entries, ["Main"]);

        let leaves: Vec<_> = graph.leaf_methods().into_iter().map(|n| n.method.name.as_str()).collect();
        assert_eq!(leaves, ["C"]);

        let recursive: Vec<_> = graph
            .recursive_methods()
            .into_iter()
            .map(|n| n.method.name.as_str())
            .collect();
        assert_eq!(recursive, ["A", "B", "D"]);

        assert!(graph.callees(&id("Missing", 9)).is_empty());
        assert_eq!(
            graph.stats(),
            CallGraphStats {
                method_count: 5,
                edge_count: 6,
                external_methods: 0,
                entry_points: 1,
                leaf_methods: 1,
                recursive_methods: 3,
                truncated_bodies: 0,
            }
        );
    }

    #[test]
    fn subgraph_includes_external_calls() {
        let (assembly, main) = fixture();
        let graph = CallGraph::build_subgraph(&assembly, &main, 10);

        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.root().map(|n| n.method.name.as_str()), Some("Main"));

        let external: Vec<_> = graph.nodes().filter(|n| n.is_external).collect();
        assert_eq!(external.len(), 1);
        assert_eq!(external[0].method.name, "WriteLine");
        assert_eq!(external[0].depth, Some(1));
        assert_eq!(graph.node(&id("C", 4)).and_then(|n| n.depth), Some(3));
    }

    #[test]
    fn subgraph_respects_depth() {
        let (assembly, main) = fixture();

        let only_root = CallGraph::build_subgraph(&assembly, &main, 0);
        assert_eq!(only_root.node_count(), 1);
        assert_eq!(only_root.edge_count(), 0);

        let shallow = CallGraph::build_subgraph(&assembly, &main, 1);
        let names: HashSet<_> = shallow.nodes().map(|n| n.method.name.as_str()).collect();
        assert_eq!(names, HashSet::from(["Main", "A", "WriteLine"]));
        // A sits at the bound and is not expanded
        assert!(shallow.callees(&id("A", 2)).is_empty());

        let two = CallGraph::build_subgraph(&assembly, &main, 2);
        assert!(two.nodes().all(|n| n.depth.is_some_and(|d| d <= 2)));
        assert!(two.contains(&id("B", 3)));
        assert!(!two.contains(&id("C", 4)));
        // A -> A is an edge between nodes already present
        assert!(two.edges().any(|e| e.from == e.to));
    }

    #[test]
    fn subgraph_handles_mutual_recursion() {
        let (assembly, _) = fixture();
        let b = assembly
            .methods()
            .into_iter()
            .find(|m| m.name == "B")
            .unwrap();

        let graph = CallGraph::build_subgraph(&assembly, &b, usize::MAX);
        let ids: Vec<_> = graph.nodes().map(|n| n.id.clone()).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn truncated_bodies_are_reported() {
        let mut assembly = InMemoryAssembly::new("Acme");
        assembly.add_method(method("Target", 2), body(&[]));
        // call Target, then a reserved opcode
        let mut code = call(0x0600_0002);
        code.push(0x24);
        let broken = assembly.add_method(method("Broken", 1), code);

        let graph = CallGraph::build_assembly(&assembly);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.truncated_bodies().len(), 1);
        assert_eq!(graph.truncated_bodies()[0].0, broken.id());
        assert_eq!(graph.truncated_bodies()[0].1.offset, 5);
    }

    #[test]
    fn constructor_edges() {
        let mut assembly = InMemoryAssembly::new("Acme");
        assembly.add_method(
            MethodDescriptor::new("Acme", "Acme.Widget", ".ctor")
                .instance()
                .with_token(Token::new(0x0600_0002)),
            body(&[]),
        );
        let main = assembly.add_method(method("Main", 1), body(&[newobj(0x0600_0002), vec![0x26]]));

        let graph = CallGraph::build_subgraph(&assembly, &main, 3);
        let edge = graph.edges().next().unwrap();
        assert_eq!(edge.kind, CallKind::Construct);
        assert_eq!(edge.from, &main.id());
    }

    #[test]
    fn dot_export() {
        let (assembly, main) = fixture();
        let dot = CallGraph::build_subgraph(&assembly, &main, 10).to_dot(Some("Main \"calls\""));

        assert!(dot.starts_with("digraph CallGraph {"));
        assert!(dot.contains("label=\"Main \\\"calls\\\"\""));
        assert!(dot.contains("n0 [label=\"Acme.P::Main()\", style=filled, fillcolor=lightgreen]"));
        assert!(dot.contains("fillcolor=lightyellow"));
        assert!(dot.contains("fillcolor=lightblue"));
        assert!(dot.contains("n0 -> n1 [label=\"call\"]"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
