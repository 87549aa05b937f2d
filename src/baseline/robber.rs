use crate::game::player::{MatchRules, RobberPlayer};
use crate::graph::search::{bfs_distances, UNREACHABLE};
use crate::graph::{Graph, NodeId};
use crate::util::deadline::Deadline;

/// Reference opponent: spawn as far from the cops as possible, then greedily
/// hop to whichever reachable spot keeps the cops at bay. Never steps next
/// to a cop unless already hemmed in; ties break on total cop distance.
pub struct NaiveRobber {
    graph: Graph,
    position: Option<NodeId>,
}

impl NaiveRobber {
    pub fn new(graph: &Graph, _rules: &MatchRules) -> Self {
        Self { graph: graph.clone(), position: None }
    }

    /// Minimum hop distance from `v` to any cop; unreachable cops do not
    /// constrain the robber.
    fn min_cop_distance(cop_distances: &[Vec<u32>], v: NodeId) -> u32 {
        cop_distances
            .iter()
            .map(|distances| distances[v as usize])
            .min()
            .unwrap_or(UNREACHABLE)
    }

    fn cop_distances(&self, cop_positions: &[NodeId]) -> Vec<Vec<u32>> {
        cop_positions.iter().map(|&cop| bfs_distances(&self.graph, cop)).collect()
    }
}

impl RobberPlayer for NaiveRobber {
    fn init_position(&mut self, cop_positions: &[NodeId], _deadline: Deadline) -> NodeId {
        let cop_distances = self.cop_distances(cop_positions);
        let position = self
            .graph
            .nodes()
            .max_by_key(|&v| (Self::min_cop_distance(&cop_distances, v), v))
            .expect("placement on an empty graph");
        self.position = Some(position);
        position
    }

    fn step(&mut self, cop_positions: &[NodeId], _deadline: Deadline) -> NodeId {
        let position = self.position.expect("step before initial placement");
        let cop_distances = self.cop_distances(cop_positions);

        let mut candidates: Vec<NodeId> = vec![position];
        candidates.extend_from_slice(self.graph.neighbors(position));

        // Hemmed in (a cop one step away), any uncovered node will do;
        // otherwise insist on keeping the cops at least two steps off.
        let hemmed_in = Self::min_cop_distance(&cop_distances, position) <= 1;
        let threshold = if hemmed_in { 0 } else { 1 };

        let next = candidates
            .iter()
            .copied()
            .filter(|&v| Self::min_cop_distance(&cop_distances, v) > threshold)
            .max_by_key(|&v| {
                let total: u64 = cop_distances
                    .iter()
                    .map(|distances| distances[v as usize].min(self.graph.n_nodes() as u32) as u64)
                    .sum();
                (total, v)
            })
            .unwrap_or(position);

        self.position = Some(next);
        next
    }
}
