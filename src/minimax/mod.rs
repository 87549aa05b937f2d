pub mod alpha_beta;
pub mod deepening;
pub mod zobrist;

use log::trace;
use rand::rngs::SmallRng;

use crate::graph::{Graph, NodeId, NodeSet};
use crate::minimax::deepening::{iterative_deepening_minimax, FixatedSteps};
use crate::minimax::zobrist::TranspositionTable;
use crate::util::deadline::{Deadline, TimeoutLoop};

/// Grows BFS contours around the robber and yields an effective game
/// subgraph every time the frontier absorbs new cops, together with the cop
/// slots still outside it. Expansion stops beyond `max_radius`: nodes
/// farther away than the search depth cannot influence the search anyway.
pub struct EffectiveSubgraphs<'a> {
    graph: &'a Graph,
    cop_positions: &'a [NodeId],
    visited: NodeSet,
    contour: Vec<NodeId>,
    hidden: Vec<usize>,
    radius: u32,
    max_radius: u32,
}

impl<'a> EffectiveSubgraphs<'a> {
    pub fn new(
        graph: &'a Graph,
        cop_positions: &'a [NodeId],
        robber_position: NodeId,
        max_radius: u32,
    ) -> Self {
        Self {
            graph,
            cop_positions,
            visited: NodeSet::new(graph.n_nodes()),
            contour: vec![robber_position],
            hidden: (0..cop_positions.len())
                .filter(|&slot| cop_positions[slot] != robber_position)
                .collect(),
            radius: 0,
            max_radius,
        }
    }
}

impl Iterator for EffectiveSubgraphs<'_> {
    /// An effective subgraph and the cop slots it does not contain.
    type Item = (NodeSet, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.contour.is_empty() || self.radius > self.max_radius {
                return None;
            }

            for &node in &self.contour {
                self.visited.insert(node);
            }

            let mut next_contour_set = NodeSet::new(self.graph.n_nodes());
            let mut next_contour = Vec::new();
            for &node in &self.contour {
                for &neighbor in self.graph.neighbors(node) {
                    if !self.visited.contains(neighbor) && next_contour_set.insert(neighbor) {
                        next_contour.push(neighbor);
                    }
                }
            }

            let found_new_cops = self
                .hidden
                .iter()
                .any(|&slot| next_contour_set.contains(self.cop_positions[slot]));

            let effective = if found_new_cops {
                self.hidden.retain(|&slot| !next_contour_set.contains(self.cop_positions[slot]));
                let mut effective = self.visited.clone();
                for &node in &next_contour {
                    effective.insert(node);
                }
                Some((effective, self.hidden.clone()))
            } else {
                None
            };

            self.contour = next_contour;
            self.radius += 1;

            if let Some(item) = effective {
                return Some(item);
            }
        }
    }
}

/// One minimax searcher per level graph. The transposition table persists
/// across moves of the same match, so work done on earlier moves keeps
/// accelerating later ones.
pub struct MinimaxEngine {
    table: TranspositionTable,
}

impl MinimaxEngine {
    pub fn new(n_nodes: usize, n_cops: usize, rng: &mut SmallRng) -> Self {
        Self { table: TranspositionTable::new(n_nodes, n_cops, rng) }
    }

    /// Best cop move on `graph`, playing iterative deepening on increasingly
    /// broad contours around the robber with the cops outside each contour
    /// fixated. Returns as soon as a contour yields a winning move.
    pub fn best_cop_move(
        &mut self,
        graph: &Graph,
        cop_positions: &[NodeId],
        robber_position: NodeId,
        depth: u32,
        fixated_steps: &FixatedSteps,
        deadline: Deadline,
    ) -> (Vec<NodeId>, bool) {
        let mut best_move = cop_positions.to_vec();
        let mut winning = false;

        let mut guard = TimeoutLoop::with_tolerance(deadline, 2.0);
        for (effective, hidden) in
            EffectiveSubgraphs::new(graph, cop_positions, robber_position, depth)
        {
            let ran = guard.run(|| {
                (best_move, winning) = iterative_deepening_minimax(
                    graph,
                    &effective,
                    cop_positions,
                    robber_position,
                    depth,
                    deadline,
                    &mut self.table,
                    &hidden,
                    fixated_steps,
                );
            });
            trace!(
                "contour search over {} nodes, {} hidden cops: winning={winning}",
                effective.len(),
                hidden.len()
            );
            if !ran || winning {
                break;
            }
        }

        (best_move, winning)
    }
}

#[cfg(test)]
mod engine_tests {
    use std::time::Duration;

    use rand::SeedableRng;

    use super::*;
    use crate::graph::gen;
    use crate::strategy::pursuit::disjoint_search_steps;

    #[test]
    fn contours_absorb_cops_outward() {
        let graph = gen::path(7);
        let yields: Vec<_> = EffectiveSubgraphs::new(&graph, &[1, 6], 3, 6).collect();
        assert_eq!(yields.len(), 2);

        // Radius 2 reaches the cop at 1; the cop at 6 stays hidden.
        let (effective, hidden) = &yields[0];
        assert_eq!(hidden, &vec![1]);
        assert!(effective.contains(1) && effective.contains(5));
        assert!(!effective.contains(6));

        // Radius 3 absorbs the second cop.
        let (effective, hidden) = &yields[1];
        assert!(hidden.is_empty());
        assert!(effective.contains(6));
    }

    #[test]
    fn expansion_respects_the_radius_cap() {
        let graph = gen::path(12);
        let yields: Vec<_> = EffectiveSubgraphs::new(&graph, &[11], 0, 3).collect();
        assert!(yields.is_empty());
    }

    #[test]
    fn engine_finds_a_winning_move_on_a_path() {
        let graph = gen::path(5);
        let mut engine = MinimaxEngine::new(5, 1, &mut SmallRng::seed_from_u64(3));
        let (joint_move, winning) = engine.best_cop_move(
            &graph,
            &[0],
            4,
            6,
            &|cops, robber| disjoint_search_steps(&graph, cops, robber),
            Deadline::after(Duration::from_secs(10)),
        );
        assert!(winning);
        assert_eq!(joint_move, vec![1]);
    }

    #[test]
    fn engine_reuses_its_table_across_calls() {
        let graph = gen::cycle(8);
        let mut engine = MinimaxEngine::new(8, 2, &mut SmallRng::seed_from_u64(3));
        let deadline = Deadline::after(Duration::from_secs(10));
        let fixated = |cops: &[NodeId], robber: NodeId| disjoint_search_steps(&graph, cops, robber);

        let (first, _) = engine.best_cop_move(&graph, &[0, 4], 2, 6, &fixated, deadline);
        let (second, _) = engine.best_cop_move(&graph, &[0, 4], 2, 6, &fixated, deadline);
        assert_eq!(first, second);
    }
}
