use rand::rngs::SmallRng;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::abstraction::hierarchy::AbstractionHierarchy;
use crate::graph::{Graph, NodeId};
use crate::util::deadline::{Deadline, TimeoutLoop};

/// The robber's strategy on one connected component: race the cops'
/// BFS frontiers against its own and run toward the last node its own
/// frontier claimed before contact, the spot the cops take longest to
/// reach.
pub struct ContourRelaxationStrategy {
    hierarchy: AbstractionHierarchy,
    rng: SmallRng,
}

impl ContourRelaxationStrategy {
    pub fn new(graph: &Graph, deadline: Deadline, rng: SmallRng) -> Self {
        let mut hierarchy = AbstractionHierarchy::new(graph);
        // Coarsest first; the literal level is done last and only if time
        // allows, leaving `is_populated` honest on whatever was cut short.
        hierarchy.populate_shortest_path_lengths(deadline);
        Self { hierarchy, rng }
    }

    /// Starting node: maximise the minimum distance to any cop, on the
    /// literal graph if its store is populated, else on the most precise
    /// populated abstraction (landing on a random pre-image), else any node.
    pub fn init(&mut self, cop_positions: &[NodeId]) -> NodeId {
        let literal = self.hierarchy.level(0);

        if literal.distances.is_populated() {
            return literal
                .graph
                .nodes()
                .max_by_key(|&v| {
                    cop_positions.iter().map(|&cop| literal.distances.distance(v, cop)).min()
                })
                .unwrap();
        }

        let informed =
            self.hierarchy.lowest_fitting(|level| level.distances.is_populated());
        if let Some(index) = informed {
            let level = self.hierarchy.level(index);
            let abstract_best = level
                .graph
                .nodes()
                .max_by_key(|&v| {
                    cop_positions
                        .iter()
                        .map(|&cop| level.distances.distance(v, level.abstract_node(cop)))
                        .min()
                })
                .unwrap();
            let pre_image = level.invert_node(abstract_best);
            return pre_image[self.rng.random_range(0..pre_image.len())];
        }

        let n = literal.graph.n_nodes();
        self.rng.random_range(0..n as NodeId)
    }

    /// One robber move: expand cop and robber contours in lockstep (cops
    /// first, so contested nodes count as theirs), remember the last node
    /// the robber frontier claimed, and step toward it along the frontier's
    /// predecessor tree. Runs under a timeout guard; an interrupted race
    /// still leaves a valid cover node.
    pub fn step(
        &mut self,
        cop_positions: &[NodeId],
        robber_position: NodeId,
        deadline: Deadline,
    ) -> NodeId {
        let graph = &self.hierarchy.level(0).graph;
        let mut visited = vec![false; graph.n_nodes()];
        let mut predecessor: FxHashMap<NodeId, NodeId> = FxHashMap::default();

        let mut cop_contour: Vec<NodeId> = cop_positions.to_vec();
        let mut robber_contour: Vec<NodeId> = vec![robber_position];
        let mut cover_node = robber_position;

        let mut guard = TimeoutLoop::new(deadline);
        while !cop_contour.is_empty() && !robber_contour.is_empty() {
            let ran = guard.run(|| {
                let mut next_cop_contour = Vec::new();
                let mut next_robber_contour = Vec::new();

                for &node in &cop_contour {
                    if visited[node as usize] {
                        continue;
                    }
                    visited[node as usize] = true;
                    for &neighbor in graph.neighbors(node) {
                        if !visited[neighbor as usize] {
                            next_cop_contour.push(neighbor);
                        }
                    }
                }

                for &node in &robber_contour {
                    if visited[node as usize] {
                        continue;
                    }
                    visited[node as usize] = true;
                    // Still unclaimed by any cop frontier when expanded.
                    cover_node = node;
                    for &neighbor in graph.neighbors(node) {
                        if !visited[neighbor as usize] {
                            next_robber_contour.push(neighbor);
                            predecessor.entry(neighbor).or_insert(node);
                        }
                    }
                }

                cop_contour = next_cop_contour;
                robber_contour = next_robber_contour;
            });
            if !ran {
                break;
            }
        }

        walk_toward(robber_position, cover_node, &predecessor)
    }
}

/// First step from the robber toward `target` along the predecessor tree the
/// frontier race built.
fn walk_toward(
    robber_position: NodeId,
    target: NodeId,
    predecessor: &FxHashMap<NodeId, NodeId>,
) -> NodeId {
    let mut node = target;
    while let Some(&previous) = predecessor.get(&node) {
        if previous == robber_position {
            return node;
        }
        node = previous;
    }
    node
}
