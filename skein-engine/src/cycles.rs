//! Cycle detection and breaking.
//!
//! Cycles are found as strongly connected components of the connection
//! graph. Each cycle is recorded as an ordered member walk, then enough
//! removable connections are taken out to leave an acyclic skeleton for the
//! initial topological ordering. The removed connections are not discarded:
//! the cyclic subgraph runner re-enters the cycle through the original
//! graph.
//!
//! A connection is removable only if the receiving socket is variadic or
//! carries a default value. The engine waits for a component's mandatory
//! inputs before running it, so breaking a mandatory scalar connection
//! would just move the deadlock to run time.

use crate::graph::PipelineGraph;
use skein_core::error::{Result, SkeinError};
use skein_core::types::ComponentId;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// The cycles of a graph and the connections removed to break them.
#[derive(Debug, Default)]
pub struct CycleAnalysis {
    /// Ordered member walks, one per cycle, starting from the cycle's
    /// smallest-id member.
    cycles: Vec<Vec<ComponentId>>,
    /// Cycle indexes each component participates in.
    membership: HashMap<ComponentId, Vec<usize>>,
    /// Indexes into the graph's connection list removed to produce the
    /// acyclic skeleton.
    removed: HashSet<usize>,
}

impl CycleAnalysis {
    /// All detected cycles.
    #[must_use]
    pub fn cycles(&self) -> &[Vec<ComponentId>] {
        &self.cycles
    }

    /// The cycles the given component belongs to. The first entry is the
    /// cycle the runner hands off to when the component is scheduled.
    #[must_use]
    pub fn cycles_of(&self, id: ComponentId) -> &[usize] {
        self.membership.get(&id).map_or(&[], |v| v.as_slice())
    }

    /// Connection indexes removed to produce the acyclic skeleton.
    #[must_use]
    pub fn removed_connections(&self) -> &HashSet<usize> {
        &self.removed
    }

    /// True when the graph contains at least one cycle.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Detect all cycles and remove enough removable connections to make the
/// remaining graph acyclic.
///
/// This is a no-op returning an empty analysis when the graph is already
/// acyclic. Fails with [`SkeinError::UnbreakableCycle`] when a cycle has no
/// removable connection left and is therefore impossible to order.
pub fn break_cycles(graph: &PipelineGraph) -> Result<CycleAnalysis> {
    let sccs = strongly_connected_components(graph);

    let mut analysis = CycleAnalysis::default();
    for scc in sccs {
        let is_cycle = scc.len() > 1 || has_self_loop(graph, scc[0]);
        if !is_cycle {
            continue;
        }

        let members: BTreeSet<ComponentId> = scc.iter().copied().collect();
        let walk = ordered_walk(graph, &members);
        let cycle_idx = analysis.cycles.len();
        for member in &walk {
            analysis.membership.entry(*member).or_default().push(cycle_idx);
        }
        analysis.cycles.push(walk);

        remove_breakable_connections(graph, &members, &mut analysis.removed)?;
    }

    if analysis.has_cycles() {
        tracing::debug!(
            cycles = analysis.cycles.len(),
            removed_connections = analysis.removed.len(),
            "broke cycles for topological ordering"
        );
    }
    Ok(analysis)
}

/// Tarjan's algorithm over the connection graph.
///
/// Components are visited in registration order and adjacency follows
/// connection order, so the result is deterministic.
fn strongly_connected_components(graph: &PipelineGraph) -> Vec<Vec<ComponentId>> {
    const UNVISITED: u32 = u32::MAX;

    struct Tarjan {
        adj: Vec<Vec<usize>>,
        index: Vec<u32>,
        lowlink: Vec<u32>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        counter: u32,
        sccs: Vec<Vec<usize>>,
    }

    impl Tarjan {
        fn visit(&mut self, v: usize) {
            self.index[v] = self.counter;
            self.lowlink[v] = self.counter;
            self.counter += 1;
            self.stack.push(v);
            self.on_stack[v] = true;

            for i in 0..self.adj[v].len() {
                let w = self.adj[v][i];
                if self.index[w] == UNVISITED {
                    self.visit(w);
                    self.lowlink[v] = self.lowlink[v].min(self.lowlink[w]);
                } else if self.on_stack[w] {
                    self.lowlink[v] = self.lowlink[v].min(self.index[w]);
                }
            }

            if self.lowlink[v] == self.index[v] {
                let mut scc = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w] = false;
                    scc.push(w);
                    if w == v {
                        break;
                    }
                }
                self.sccs.push(scc);
            }
        }
    }

    let n = graph.len();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for conn in graph.connections() {
        adj[conn.sender.index()].push(conn.receiver.index());
    }

    let mut tarjan = Tarjan {
        adj,
        index: vec![UNVISITED; n],
        lowlink: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        counter: 0,
        sccs: Vec::new(),
    };

    for v in 0..n {
        if tarjan.index[v] == UNVISITED {
            tarjan.visit(v);
        }
    }

    tarjan
        .sccs
        .into_iter()
        .map(|scc| scc.into_iter().map(|v| ComponentId::new(v as u32)).collect())
        .collect()
}

fn has_self_loop(graph: &PipelineGraph, id: ComponentId) -> bool {
    graph
        .connections()
        .iter()
        .any(|c| c.sender == id && c.receiver == id)
}

/// Order the members of a cycle as a deterministic walk: a depth-first
/// preorder from the smallest-id member, following connections inside the
/// cycle.
fn ordered_walk(graph: &PipelineGraph, members: &BTreeSet<ComponentId>) -> Vec<ComponentId> {
    let Some(&root) = members.iter().next() else {
        return Vec::new();
    };

    let mut order = Vec::with_capacity(members.len());
    let mut seen: HashSet<ComponentId> = HashSet::new();
    let mut stack = vec![root];

    while let Some(v) = stack.pop() {
        if !seen.insert(v) {
            continue;
        }
        order.push(v);
        // Reverse push keeps neighbour visit order aligned with connection order.
        let neighbours: Vec<ComponentId> = graph
            .connections()
            .iter()
            .filter(|c| c.sender == v && members.contains(&c.receiver))
            .map(|c| c.receiver)
            .collect();
        for w in neighbours.into_iter().rev() {
            if !seen.contains(&w) {
                stack.push(w);
            }
        }
    }

    order
}

/// Remove connections closing the given cycle until its subgraph is acyclic.
///
/// Candidates are considered in connection order; only connections whose
/// receiving socket is variadic or defaulted may be removed.
fn remove_breakable_connections(
    graph: &PipelineGraph,
    members: &BTreeSet<ComponentId>,
    removed: &mut HashSet<usize>,
) -> Result<()> {
    for (idx, conn) in graph.connections().iter().enumerate() {
        if subgraph_is_acyclic(graph, members, removed) {
            return Ok(());
        }
        if removed.contains(&idx)
            || !members.contains(&conn.sender)
            || !members.contains(&conn.receiver)
        {
            continue;
        }
        let Some(socket) = graph.node(conn.receiver).input(&conn.receiver_socket) else {
            continue;
        };
        if !socket.is_variadic && socket.is_mandatory() {
            continue;
        }
        removed.insert(idx);
    }

    if subgraph_is_acyclic(graph, members, removed) {
        return Ok(());
    }

    Err(SkeinError::UnbreakableCycle {
        components: members
            .iter()
            .map(|id| graph.node(*id).name().to_string())
            .collect(),
    })
}

/// Kahn's algorithm restricted to the given members, ignoring removed
/// connections.
fn subgraph_is_acyclic(
    graph: &PipelineGraph,
    members: &BTreeSet<ComponentId>,
    removed: &HashSet<usize>,
) -> bool {
    let mut in_degree: HashMap<ComponentId, usize> =
        members.iter().map(|m| (*m, 0)).collect();
    for (idx, conn) in graph.connections().iter().enumerate() {
        if removed.contains(&idx) || !members.contains(&conn.sender) {
            continue;
        }
        if let Some(d) = in_degree.get_mut(&conn.receiver) {
            *d += 1;
        }
    }

    let mut queue: VecDeque<ComponentId> = members
        .iter()
        .copied()
        .filter(|m| in_degree[m] == 0)
        .collect();
    let mut visited = 0;

    while let Some(v) = queue.pop_front() {
        visited += 1;
        for (idx, conn) in graph.connections().iter().enumerate() {
            if removed.contains(&idx) || conn.sender != v {
                continue;
            }
            if let Some(d) = in_degree.get_mut(&conn.receiver) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(conn.receiver);
                }
            }
        }
    }

    visited == members.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_core::component::{Component, ComponentInfo, ComponentResult, ValueMap};
    use skein_core::socket::{InputSocket, OutputSocket};
    use skein_core::value::Value;

    struct Relay {
        defaulted: bool,
    }

    impl Component for Relay {
        fn info(&self) -> ComponentInfo {
            let mut input = InputSocket::new("in", "Any");
            if self.defaulted {
                input = input.with_default(Value::int(0));
            }
            ComponentInfo::new()
                .with_inputs(vec![input])
                .with_outputs(vec![OutputSocket::new("out", "Any")])
        }

        fn run(&self, inputs: ValueMap) -> ComponentResult {
            let mut out = ValueMap::new();
            if let Some(v) = inputs.get("in") {
                out.insert("out".to_string(), v.clone());
            }
            Ok(out)
        }
    }

    fn relay(defaulted: bool) -> Box<Relay> {
        Box::new(Relay { defaulted })
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let mut graph = PipelineGraph::new();
        graph.add_component("a", relay(false)).unwrap();
        graph.add_component("b", relay(false)).unwrap();
        graph.connect("a.out", "b.in").unwrap();

        let analysis = break_cycles(&graph).unwrap();
        assert!(!analysis.has_cycles());
        assert!(analysis.removed_connections().is_empty());
    }

    #[test]
    fn two_node_cycle_is_broken_at_defaulted_socket() {
        let mut graph = PipelineGraph::new();
        graph.add_component("a", relay(true)).unwrap();
        graph.add_component("b", relay(false)).unwrap();
        graph.connect("a.out", "b.in").unwrap();
        graph.connect("b.out", "a.in").unwrap();

        let analysis = break_cycles(&graph).unwrap();
        assert_eq!(analysis.cycles().len(), 1);

        let a = graph.id_of("a").unwrap();
        let b = graph.id_of("b").unwrap();
        assert_eq!(analysis.cycles()[0], vec![a, b]);
        assert_eq!(analysis.cycles_of(a), &[0]);
        assert_eq!(analysis.cycles_of(b), &[0]);

        // Only the connection into the defaulted socket can be removed.
        assert_eq!(
            analysis.removed_connections().iter().copied().collect::<Vec<_>>(),
            vec![1]
        );

        // The skeleton orders the cycle starting from its entry point.
        let order = graph.topological_sort(analysis.removed_connections());
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn unbreakable_cycle_is_a_config_error() {
        let mut graph = PipelineGraph::new();
        graph.add_component("a", relay(false)).unwrap();
        graph.add_component("b", relay(false)).unwrap();
        graph.connect("a.out", "b.in").unwrap();
        graph.connect("b.out", "a.in").unwrap();

        let err = break_cycles(&graph).unwrap_err();
        assert!(matches!(err, SkeinError::UnbreakableCycle { .. }));
        assert!(err.is_config_error());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut graph = PipelineGraph::new();
        graph.add_component("echo", relay(true)).unwrap();
        graph.connect("echo.out", "echo.in").unwrap();

        let analysis = break_cycles(&graph).unwrap();
        assert_eq!(analysis.cycles().len(), 1);
        let echo = graph.id_of("echo").unwrap();
        assert_eq!(analysis.cycles()[0], vec![echo]);
        assert_eq!(analysis.removed_connections().len(), 1);
    }
}
