//! Evaluation scheduling: Kahn's topological sort over the combinational
//! subgraph, with sequential and memory outputs treated as pseudo-inputs so
//! feedback through state elements does not count as a cycle.

use std::collections::{HashMap, HashSet, VecDeque};

use log::warn;

use crate::wire::flatten::{FlatCircuit, FlatNode};

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    /// Combinational nodes in dependency order for a single pass.
    pub combinational_order: Vec<usize>,
    /// DFFs; state captured on clock edges.
    pub sequential_nodes: Vec<usize>,
    /// RAM/ROM; read during the combinational pass, written on edges.
    pub memory_nodes: Vec<usize>,
    /// Wires produced by sequential or memory nodes.
    pub feedback_wires: HashSet<usize>,
    /// True iff the combinational graph is not a DAG after removing
    /// feedback wires. Evaluation still runs; ordering of the cyclic
    /// remainder is arbitrary.
    pub has_cycles: bool,
}

pub fn schedule(circuit: &FlatCircuit) -> Schedule {
    let mut sequential_nodes = Vec::new();
    let mut memory_nodes = Vec::new();
    let mut combinational = Vec::new();
    for (i, node) in circuit.nodes.iter().enumerate() {
        match node {
            FlatNode::Dff { .. } => sequential_nodes.push(i),
            FlatNode::Ram { .. } | FlatNode::Rom { .. } => memory_nodes.push(i),
            _ => combinational.push(i),
        }
    }

    let mut feedback_wires = HashSet::new();
    for &n in sequential_nodes.iter().chain(&memory_nodes) {
        feedback_wires.insert(circuit.nodes[n].out());
    }
    let top_inputs: HashSet<usize> = circuit.inputs.iter().map(|p| p.index).collect();

    // Wire → combinational producer. Each wire has at most one producer.
    let mut producer: HashMap<usize, usize> = HashMap::new();
    for &n in &combinational {
        producer.insert(circuit.nodes[n].out(), n);
    }

    let mut in_degree: HashMap<usize, usize> = combinational.iter().map(|&n| (n, 0)).collect();
    let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();
    for &n in &combinational {
        for wire in circuit.nodes[n].inputs() {
            if feedback_wires.contains(&wire) || top_inputs.contains(&wire) {
                continue;
            }
            if let Some(&p) = producer.get(&wire) {
                successors.entry(p).or_default().push(n);
                *in_degree.entry(n).or_default() += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = combinational
        .iter()
        .copied()
        .filter(|n| in_degree[n] == 0)
        .collect();
    let mut combinational_order = Vec::with_capacity(combinational.len());
    while let Some(n) = queue.pop_front() {
        combinational_order.push(n);
        if let Some(next) = successors.get(&n) {
            for &s in next {
                if let Some(d) = in_degree.get_mut(&s) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(s);
                    }
                }
            }
        }
    }

    let has_cycles = combinational_order.len() != combinational.len();
    if has_cycles {
        let stuck = combinational.len() - combinational_order.len();
        warn!("combinational cycle detected: {stuck} nodes could not be ordered");
        // Append the cyclic remainder so evaluation still runs; their
        // relative order is arbitrary.
        let placed: HashSet<usize> = combinational_order.iter().copied().collect();
        for &n in &combinational {
            if !placed.contains(&n) {
                combinational_order.push(n);
            }
        }
    }

    Schedule {
        combinational_order,
        sequential_nodes,
        memory_nodes,
        feedback_wires,
        has_cycles,
    }
}
