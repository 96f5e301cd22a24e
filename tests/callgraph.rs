//! Call graph integration tests.
//!
//! A small binary is assembled in memory:
//!
//! ```text
//! Program::Main  --newobj-->   Widget::.ctor
//!                --callvirt--> Widget::Render --call--> Canvas::Draw --call--> Console::Write (external)
//!                --call-->     Program::Log   --call--> Canvas::Draw
//! Canvas::Draw   --call-->     Canvas::Draw (retry loop)
//! Program::Unused            (never called)
//! ```
//!
//! and both graph modes are checked against it.

use std::sync::Arc;

use dotprobe::{
    analysis::{CallGraph, CallKind},
    metadata::{loader::InMemoryAssembly, method::MethodDescriptor, token::Token},
};

const CTOR: u32 = 0x0600_0001;
const RENDER: u32 = 0x0600_0002;
const DRAW: u32 = 0x0600_0003;
const LOG: u32 = 0x0600_0004;
const MAIN: u32 = 0x0600_0005;
const UNUSED: u32 = 0x0600_0006;
const WRITE: u32 = 0x0A00_0001;

fn op(opcode: u8, token: u32) -> Vec<u8> {
    let mut code = vec![opcode];
    code.extend_from_slice(&token.to_le_bytes());
    code
}

fn body(parts: &[Vec<u8>]) -> Vec<u8> {
    let mut code = parts.concat();
    code.push(0x2A);
    code
}

fn binary() -> (InMemoryAssembly, Arc<MethodDescriptor>) {
    let mut assembly = InMemoryAssembly::new("Acme");
    assembly.add_external_method(
        Token::new(WRITE),
        MethodDescriptor::new("mscorlib", "System.Console", "Write"),
    );

    assembly.add_method(
        MethodDescriptor::new("Acme", "Acme.Widget", ".ctor")
            .instance()
            .with_token(Token::new(CTOR)),
        body(&[]),
    );
    assembly.add_method(
        MethodDescriptor::new("Acme", "Acme.Widget", "Render")
            .instance()
            .with_token(Token::new(RENDER)),
        body(&[op(0x28, DRAW)]),
    );
    assembly.add_method(
        MethodDescriptor::new("Acme", "Acme.Canvas", "Draw").with_token(Token::new(DRAW)),
        body(&[op(0x28, WRITE), op(0x28, DRAW)]),
    );
    assembly.add_method(
        MethodDescriptor::new("Acme", "Acme.Program", "Log").with_token(Token::new(LOG)),
        body(&[op(0x28, DRAW)]),
    );
    let main = assembly.add_method(
        MethodDescriptor::new("Acme", "Acme.Program", "Main").with_token(Token::new(MAIN)),
        body(&[op(0x73, CTOR), op(0x6F, RENDER), op(0x28, LOG)]),
    );
    assembly.add_method(
        MethodDescriptor::new("Acme", "Acme.Program", "Unused").with_token(Token::new(UNUSED)),
        body(&[]),
    );

    (assembly, main)
}

fn names<'a>(nodes: impl IntoIterator<Item = &'a dotprobe::analysis::CallGraphNode>) -> Vec<String> {
    let mut names: Vec<String> = nodes
        .into_iter()
        .map(|n| format!("{}::{}", n.method.declaring_type, n.method.name))
        .collect();
    names.sort();
    names
}

#[test]
fn assembly_graph_covers_every_method_and_no_external_ones() {
    let (assembly, _) = binary();
    let graph = CallGraph::build_assembly(&assembly);

    assert_eq!(graph.node_count(), 6);
    assert!(graph.nodes().all(|n| n.method.assembly == "Acme" && !n.is_external));
    assert!(!names(graph.nodes()).contains(&"System.Console::Write".to_string()));

    // .ctor, Render, Log from Main; Draw from Render, Log and itself
    assert_eq!(graph.edge_count(), 6);
    let kinds: Vec<CallKind> = graph.edges().map(|e| e.kind).collect();
    assert!(kinds.contains(&CallKind::Construct));
    assert!(kinds.contains(&CallKind::VirtualCall));

    assert_eq!(
        names(graph.entry_points()),
        ["Acme.Program::Main", "Acme.Program::Unused"]
    );
    assert_eq!(
        names(graph.recursive_methods()),
        ["Acme.Canvas::Draw"]
    );
}

#[test]
fn callers_are_distinct_methods() {
    let (assembly, main) = binary();
    let graph = CallGraph::build_assembly(&assembly);

    let draw = MethodDescriptor::new("Acme", "Acme.Canvas", "Draw").id();
    assert_eq!(
        names(graph.callers(&draw)),
        ["Acme.Canvas::Draw", "Acme.Program::Log", "Acme.Widget::Render"]
    );
    assert_eq!(
        names(graph.callees(&main.id())),
        ["Acme.Program::Log", "Acme.Widget::.ctor", "Acme.Widget::Render"]
    );
}

#[test]
fn subgraph_is_bounded_by_depth() {
    let (assembly, main) = binary();

    let root_only = CallGraph::build_subgraph(&assembly, &main, 0);
    assert_eq!(root_only.node_count(), 1);
    assert_eq!(root_only.edge_count(), 0);
    assert_eq!(root_only.root().map(|n| n.id.clone()), Some(main.id()));

    let direct = CallGraph::build_subgraph(&assembly, &main, 1);
    assert_eq!(direct.node_count(), 4);
    assert!(direct.nodes().all(|n| n.depth.is_some_and(|d| d <= 1)));

    let full = CallGraph::build_subgraph(&assembly, &main, 10);
    // Main, .ctor, Render, Log, Draw, Write; Unused is unreachable
    assert_eq!(full.node_count(), 6);
    for node in full.nodes() {
        assert!(node.depth.is_some_and(|d| d <= 10));
    }
    let write = full
        .nodes()
        .find(|n| n.method.name == "Write")
        .expect("external callee is part of the subgraph");
    assert!(write.is_external);
    assert_eq!(write.depth, Some(3));
}

#[test]
fn subgraph_nodes_are_unique_and_take_the_shortest_depth() {
    let (assembly, main) = binary();
    let graph = CallGraph::build_subgraph(&assembly, &main, 10);

    let mut ids: Vec<_> = graph.nodes().map(|n| n.id.clone()).collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);

    // Draw is reachable through Render and Log, both at depth 1
    let draw = graph
        .nodes()
        .find(|n| n.method.name == "Draw")
        .expect("Draw is reachable");
    assert_eq!(draw.depth, Some(2));
    assert!(graph.truncated_bodies().is_empty());
}

#[test]
fn graphs_are_deterministic() {
    let (assembly, main) = binary();

    let first = CallGraph::build_assembly(&assembly).to_dot(None);
    for _ in 0..8 {
        assert_eq!(CallGraph::build_assembly(&assembly).to_dot(None), first);
    }

    let sub = CallGraph::build_subgraph(&assembly, &main, 10).to_dot(Some("Main"));
    assert_eq!(CallGraph::build_subgraph(&assembly, &main, 10).to_dot(Some("Main")), sub);
    assert!(sub.contains("label=\"Main\";"));
    assert!(sub.contains("[label=\"callvirt\"]") || sub.contains("[label=\"newobj\"]"));
}

#[test]
fn stats_summarize_the_graph() {
    let (assembly, _) = binary();
    let stats = CallGraph::build_assembly(&assembly).stats();

    assert_eq!(stats.method_count, 6);
    assert_eq!(stats.edge_count, 6);
    assert_eq!(stats.external_methods, 0);
    assert_eq!(stats.entry_points, 2);
    assert_eq!(stats.recursive_methods, 1);
    assert_eq!(stats.truncated_bodies, 0);
}
