use float_ord::FloatOrd;

use crate::game::player::{CopsPlayer, MatchRules};
use crate::graph::search::{bfs_distances, path_to_any, UNREACHABLE};
use crate::graph::{Graph, NodeId, NodeSet};
use crate::util::deadline::Deadline;

/// Reference opponent: place on the most central nodes, then walk every cop
/// down a shortest path toward the robber, knocking each claimed next node
/// out of the working graph so the pack fans out instead of forming a conga
/// line. No abstraction, no search horizon, no time awareness beyond
/// returning fast.
pub struct NaiveCops {
    graph: Graph,
    n_cops: usize,
    positions: Vec<NodeId>,
}

impl NaiveCops {
    pub fn new(graph: &Graph, rules: &MatchRules) -> Self {
        Self { graph: graph.clone(), n_cops: rules.n_cops, positions: Vec::new() }
    }

    /// Closeness centrality, scaled by reachable share so small components
    /// do not look artificially central.
    fn closeness(&self, v: NodeId) -> f64 {
        let distances = bfs_distances(&self.graph, v);
        let reachable: Vec<u32> =
            distances.iter().copied().filter(|&d| d != UNREACHABLE).collect();
        let total: u64 = reachable.iter().map(|&d| d as u64).sum();
        if total == 0 {
            return 0.0;
        }
        let r = reachable.len() as f64 - 1.0;
        let n = self.graph.n_nodes() as f64 - 1.0;
        (r / total as f64) * (r / n)
    }
}

impl CopsPlayer for NaiveCops {
    fn init_positions(&mut self, _deadline: Deadline) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.graph.nodes().collect();
        nodes.sort_by_key(|&v| (FloatOrd(-self.closeness(v)), v));
        nodes.truncate(self.n_cops);
        while nodes.len() < self.n_cops {
            nodes.push(nodes[0]);
        }
        self.positions = nodes.clone();
        nodes
    }

    fn step(&mut self, robber_position: NodeId, _deadline: Deadline) -> Vec<NodeId> {
        let mut working = NodeSet::new(self.graph.n_nodes());
        for v in self.graph.nodes() {
            working.insert(v);
        }

        let mut available: Vec<usize> = (0..self.positions.len())
            .filter(|&i| {
                path_to_any(&self.graph, self.positions[i], &[robber_position], None).is_some()
            })
            .collect();
        let mut reserve = Vec::new();

        while !available.is_empty() {
            // Closest first, by distance in the pruned working graph.
            let paths: Vec<(usize, Option<Vec<NodeId>>)> = available
                .iter()
                .map(|&i| {
                    (i, path_to_any(&self.graph, self.positions[i], &[robber_position], Some(&working)))
                })
                .collect();

            let Some((slot, path)) = paths
                .iter()
                .filter_map(|(i, p)| p.as_ref().map(|p| (*i, p)))
                .min_by_key(|(i, p)| (p.len(), *i))
            else {
                // Everyone left is cut off in the working graph.
                reserve.extend(available.drain(..));
                break;
            };

            if path.len() == 2 {
                self.positions[slot] = path[1];
                break;
            }
            if path.len() > 2 {
                let next = path[1];
                self.positions[slot] = next;
                working.remove(next);
            }
            available.retain(|&i| i != slot);

            let cut_off: Vec<usize> = available
                .iter()
                .copied()
                .filter(|&i| {
                    path_to_any(&self.graph, self.positions[i], &[robber_position], Some(&working))
                        .is_none()
                })
                .collect();
            available.retain(|i| !cut_off.contains(i));
            reserve.extend(cut_off);
        }

        // Cut-off cops fall back to the unpruned graph.
        for slot in reserve {
            if let Some(path) =
                path_to_any(&self.graph, self.positions[slot], &[robber_position], None)
            {
                if path.len() >= 2 {
                    self.positions[slot] = path[1];
                }
            }
        }

        self.positions.clone()
    }
}

#[cfg(test)]
mod naive_cops_tests {
    use std::time::Duration;

    use super::*;
    use crate::graph::gen;

    fn rules(n_cops: usize) -> MatchRules {
        MatchRules {
            n_cops,
            timeout_init: None,
            timeout_step: None,
            max_rounds: Some(100),
            seed: 0,
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(1))
    }

    #[test]
    fn placement_prefers_central_nodes() {
        let graph = gen::path(7);
        let mut cops = NaiveCops::new(&graph, &rules(1));
        assert_eq!(cops.init_positions(deadline()), vec![3]);
    }

    #[test]
    fn steps_are_legal_and_approach_the_robber() {
        let graph = gen::grid(4, 4);
        let mut cops = NaiveCops::new(&graph, &rules(2));
        let placement = cops.init_positions(deadline());
        let next = cops.step(0, deadline());
        for (&previous, &step) in placement.iter().zip(&next) {
            assert!(step == previous || graph.has_edge(previous, step));
        }
    }

    #[test]
    fn adjacent_cop_finishes_the_chase() {
        let graph = gen::cycle(6);
        let mut cops = NaiveCops::new(&graph, &rules(1));
        cops.init_positions(deadline());
        cops.positions = vec![1];
        let next = cops.step(2, deadline());
        assert_eq!(next, vec![2]);
    }
}
