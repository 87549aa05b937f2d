use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::graph::search::first_step_on_path;
use crate::graph::{Graph, NodeId};

/// Disjoint-path pursuit: every cop advances one step along a cheap path to
/// the robber, where "cheap" penalises corridors already claimed by the cops
/// planned before it. Always returns a legal move, in
/// O(cops · (|V| + |E|) log |V|), which makes it the universal fallback.
pub fn disjoint_search_steps(
    graph: &Graph,
    cop_positions: &[NodeId],
    robber_position: NodeId,
) -> Vec<NodeId> {
    let mut penalty: FxHashMap<NodeId, u64> = FxHashMap::default();
    let mut joint_move = Vec::with_capacity(cop_positions.len());

    for &cop in cop_positions {
        match penalty_search(graph, cop, robber_position, &penalty) {
            Some(path) => {
                joint_move.push(first_step_on_path(&path));
                // Claim the corridor: the path strongly, its fringe weakly.
                for &node in &path {
                    *penalty.entry(node).or_insert(0) += 2;
                    for &neighbor in graph.neighbors(node) {
                        *penalty.entry(neighbor).or_insert(0) += 1;
                    }
                }
            }
            // A cop cut off from the robber holds its ground.
            None => joint_move.push(cop),
        }
    }

    joint_move
}

/// Shortest path under step cost `1 + penalty[node entered]`. Plain
/// Dijkstra; ties break on node id so pursuit is deterministic.
fn penalty_search(
    graph: &Graph,
    source: NodeId,
    target: NodeId,
    penalty: &FxHashMap<NodeId, u64>,
) -> Option<Vec<NodeId>> {
    let mut cost = vec![u64::MAX; graph.n_nodes()];
    let mut predecessor = vec![NodeId::MAX; graph.n_nodes()];
    let mut heap = BinaryHeap::new();

    cost[source as usize] = 0;
    heap.push(Reverse((0u64, source)));

    while let Some(Reverse((node_cost, node))) = heap.pop() {
        if node == target {
            let mut path = vec![node];
            let mut current = node;
            while current != source {
                current = predecessor[current as usize];
                path.push(current);
            }
            path.reverse();
            return Some(path);
        }
        if node_cost > cost[node as usize] {
            continue;
        }

        for &neighbor in graph.neighbors(node) {
            let step = 1 + penalty.get(&neighbor).copied().unwrap_or(0);
            let next_cost = node_cost + step;
            if next_cost < cost[neighbor as usize] {
                cost[neighbor as usize] = next_cost;
                predecessor[neighbor as usize] = node;
                heap.push(Reverse((next_cost, neighbor)));
            }
        }
    }

    None
}
