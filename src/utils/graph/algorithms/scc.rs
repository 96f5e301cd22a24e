//! Strongly connected components using Tarjan's algorithm.
//!
//! The traversal keeps its own explicit work stack instead of recursing, so hostile inputs
//! with very long call chains cannot exhaust the native stack.
//!
//! # Use Cases
//!
//! - **Recursion detection**: methods that can call each other form one component
//! - **Cycle reporting**: every component with more than one node is a cycle

use crate::utils::graph::{DirectedGraph, NodeId};

/// Returns the strongly connected components of `graph`, each as a list of node ids.
///
/// Components come out in reverse topological order of the condensed graph: a component is
/// emitted only after every component reachable from it.
pub fn strongly_connected_components<N, E>(graph: &DirectedGraph<N, E>) -> Vec<Vec<NodeId>> {
    let node_count = graph.node_count();
    let mut state = TarjanState::new(node_count);

    for i in 0..node_count {
        if state.index[i].is_none() {
            state.strongconnect(graph, NodeId::new(i));
        }
    }

    state.sccs
}

struct TarjanState {
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<NodeId>,
    current_index: usize,
    sccs: Vec<Vec<NodeId>>,
}

impl TarjanState {
    fn new(n: usize) -> Self {
        Self {
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            current_index: 0,
            sccs: Vec::new(),
        }
    }

    fn visit(&mut self, v: NodeId) {
        self.index[v.index()] = Some(self.current_index);
        self.lowlink[v.index()] = self.current_index;
        self.current_index += 1;
        self.stack.push(v);
        self.on_stack[v.index()] = true;
    }

    fn strongconnect<N, E>(&mut self, graph: &DirectedGraph<N, E>, root: NodeId) {
        // (node, successors of node, position of the next successor to look at)
        let mut work: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();
        self.visit(root);
        work.push((root, graph.successors(root).collect(), 0));

        while let Some((v, successors, next)) = work.last_mut() {
            let v = *v;
            if let Some(&w) = successors.get(*next) {
                *next += 1;
                match self.index[w.index()] {
                    None => {
                        self.visit(w);
                        work.push((w, graph.successors(w).collect(), 0));
                    }
                    Some(w_index) if self.on_stack[w.index()] => {
                        self.lowlink[v.index()] = self.lowlink[v.index()].min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            if let Some((parent, _, _)) = work.last() {
                let parent = parent.index();
                self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[v.index()]);
            }

            if Some(self.lowlink[v.index()]) == self.index[v.index()] {
                let mut scc = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w.index()] = false;
                    scc.push(w);
                    if w == v {
                        break;
                    }
                }
                self.sccs.push(scc);
            }
        }
    }
}
