use std::cmp::Reverse;
use std::hash::{Hash, Hasher};

use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHasher};

use crate::abstraction::hierarchy::AbstractionHierarchy;
use crate::graph::search::{first_step_on_path, multi_target_shortest_path};
use crate::graph::{Graph, NodeId, NodeSet};
use crate::minimax::MinimaxEngine;
use crate::strategy::pursuit::disjoint_search_steps;
use crate::util::approx::{gonzalez_k_center, pagerank, wang_cheng_weighted_k_center};
use crate::util::deadline::{Deadline, TimeoutLoop};

/// Depth of every minimax probe, abstract or literal.
pub const MINIMAX_DEPTH: u32 = 6;

/// The cops' core strategy on one connected component: play minimax on the
/// coarsest level where the game is still open, descend the hierarchy while
/// the cops keep winning, and turn the deepest winning abstract move into a
/// literal step by refinement search. Whenever the search cannot promise a
/// win in time, fall back to disjoint-path pursuit, which is always legal.
pub struct AbstractMinimaxStrategy {
    n_cops: usize,
    hierarchy: AbstractionHierarchy,
    /// One engine (and transposition table) per hierarchy level, index 0
    /// being the literal graph.
    engines: Vec<MinimaxEngine>,
    init_positions: Vec<NodeId>,
    /// Chance of still trying minimax for a position key; halved on every
    /// use so abstractly-stuck games eventually switch to pursuit.
    minimax_probability: FxHashMap<u64, f64>,
    /// Chance that a (level, position) combination times out again; set to 1
    /// before a probe, cleared on clean completion, halved when it makes us
    /// skip.
    timeout_probability: FxHashMap<u64, f64>,
    rng: SmallRng,
}

impl AbstractMinimaxStrategy {
    pub fn new(graph: &Graph, n_cops: usize, deadline: Deadline, mut rng: SmallRng) -> Self {
        let mut hierarchy = AbstractionHierarchy::new(graph);
        hierarchy.populate_shortest_path_lengths(deadline.fraction(0.75));
        hierarchy.populate_edge_ranks(deadline.fraction(0.75));

        let engines = (0..hierarchy.n_levels())
            .map(|i| MinimaxEngine::new(hierarchy.level(i).n_nodes(), n_cops, &mut rng))
            .collect();

        let mut strategy = Self {
            n_cops,
            hierarchy,
            engines,
            init_positions: Vec::new(),
            minimax_probability: FxHashMap::default(),
            timeout_probability: FxHashMap::default(),
            rng,
        };
        strategy.init_positions = strategy.compute_init_positions();
        strategy.warmup(deadline.fraction(0.25));
        strategy
    }

    pub fn init(&mut self) -> Vec<NodeId> {
        self.init_positions.clone()
    }

    /// Picks starting positions from the richest data available: weighted
    /// k-centers under PageRank weights where stores are populated (lifted
    /// from an abstraction if only one of those is), otherwise the plain
    /// Gonzalez centers.
    fn compute_init_positions(&mut self) -> Vec<NodeId> {
        let literal = &self.hierarchy.level(0).graph;

        match self.hierarchy.lowest_informed() {
            Some(0) => {
                let level = self.hierarchy.level(0);
                Self::weighted_centers(
                    &level.graph,
                    level.ranks.ranks(),
                    level.distances.pairwise(),
                    self.n_cops,
                    &mut self.rng,
                )
            }
            Some(index) => {
                let level = self.hierarchy.level(index);
                let centers = Self::weighted_centers(
                    &level.graph,
                    level.ranks.ranks(),
                    level.distances.pairwise(),
                    self.n_cops,
                    &mut self.rng,
                );
                // Lift each abstract center to its most connected pre-image.
                centers
                    .into_iter()
                    .map(|center| {
                        level
                            .invert_node(center)
                            .iter()
                            .copied()
                            .max_by_key(|&v| (literal.degree(v), Reverse(v)))
                            .unwrap()
                    })
                    .collect()
            }
            None => {
                debug!("no informed abstraction level, placing cops by Gonzalez centers");
                gonzalez_k_center(literal, self.n_cops)
            }
        }
    }

    fn weighted_centers(
        graph: &Graph,
        ranks: &FxHashMap<(NodeId, NodeId), f64>,
        distances: &[Vec<u32>],
        k: usize,
        rng: &mut SmallRng,
    ) -> Vec<NodeId> {
        let weights = match pagerank(graph, ranks) {
            Some(weights) => weights,
            None => {
                warn!("pagerank failed to converge, weighting nodes by degree");
                graph.nodes().map(|v| graph.degree(v) as f64).collect()
            }
        };
        wang_cheng_weighted_k_center(graph, distances, &weights, k, rng)
    }

    /// One move of the cops. Runs the abstract descent while some level is
    /// still undecided, with a stochastic skip that decays per position so
    /// abstract-only loops cannot repeat forever.
    pub fn step(
        &mut self,
        cop_positions: &[NodeId],
        robber_position: NodeId,
        deadline: Deadline,
    ) -> Vec<NodeId> {
        let undecided = self.hierarchy.highest_undecided(cop_positions, robber_position);

        if let Some(start_level) = undecided {
            let key = position_key(cop_positions, robber_position, u32::MAX);
            let probability = self.minimax_probability.get(&key).copied().unwrap_or(1.0);
            if self.rng.random::<f64>() < probability {
                self.minimax_probability.insert(key, probability / 2.0);
                return self.minimax_refinement(cop_positions, robber_position, start_level, deadline);
            }
        }

        disjoint_search_steps(&self.hierarchy.level(0).graph, cop_positions, robber_position)
    }

    /// Minimax at `start_level`, then descent toward the literal graph while
    /// the cops keep winning, then refinement of the deepest winning move.
    fn minimax_refinement(
        &mut self,
        cop_positions: &[NodeId],
        robber_position: NodeId,
        start_level: usize,
        deadline: Deadline,
    ) -> Vec<NodeId> {
        let minimax_deadline = deadline.fraction(0.75);

        let (mut target, winning) =
            self.abstract_minimax(start_level, cop_positions, robber_position, deadline);
        if !winning {
            debug!("not winning at level {start_level}, falling back to pursuit");
            return disjoint_search_steps(
                &self.hierarchy.level(0).graph,
                cop_positions,
                robber_position,
            );
        }
        if start_level == 0 {
            // Already a literal winning move.
            return target;
        }

        let mut level = start_level;
        loop {
            let next = level - 1;
            let timeout_key = position_key(cop_positions, robber_position, next as u32);

            // Skip with the probability that this probe times out again,
            // halving it so we retry eventually.
            let timeout = self.timeout_probability.get(&timeout_key).copied().unwrap_or(0.0);
            if self.rng.random::<f64>() < timeout {
                self.timeout_probability.insert(timeout_key, timeout / 2.0);
                break;
            }
            // Pessimistic until the probe provably completes in time.
            self.timeout_probability.insert(timeout_key, 1.0);

            let (descended_move, descended_winning) =
                self.abstract_minimax(next, cop_positions, robber_position, minimax_deadline);

            if next == 0 {
                if descended_winning {
                    self.timeout_probability.insert(timeout_key, 0.0);
                    // A literal winning move is followed as-is.
                    return descended_move;
                }
                if !deadline.has_passed() {
                    self.timeout_probability.insert(timeout_key, 0.0);
                }
                break;
            }

            if descended_winning {
                target = descended_move;
                level = next;
            }
            if !deadline.has_passed() {
                self.timeout_probability.insert(timeout_key, 0.0);
            }
            if !descended_winning {
                break;
            }
        }

        self.abstract_refinement_search(level, cop_positions, &target)
    }

    /// Runs the contour minimax engine of one level on the images of the
    /// literal positions. Level 0 is the literal graph itself.
    fn abstract_minimax(
        &mut self,
        level_index: usize,
        cop_positions: &[NodeId],
        robber_position: NodeId,
        deadline: Deadline,
    ) -> (Vec<NodeId>, bool) {
        let level = self.hierarchy.level(level_index);
        let abstract_cops = level.abstract_nodes(cop_positions);
        let abstract_robber = level.abstract_node(robber_position);
        let graph = &level.graph;

        self.engines[level_index].best_cop_move(
            graph,
            &abstract_cops,
            abstract_robber,
            MINIMAX_DEPTH,
            &|cops, robber| disjoint_search_steps(graph, cops, robber),
            deadline,
        )
    }

    /// Converts a winning abstract move into literal steps: per cop, search
    /// a path to any pre-image of its abstract target, level by level, each
    /// search confined to the pre-image of the coarser path just found.
    fn abstract_refinement_search(
        &self,
        start_level: usize,
        cop_positions: &[NodeId],
        abstract_targets: &[NodeId],
    ) -> Vec<NodeId> {
        let mut joint_move = Vec::with_capacity(cop_positions.len());

        for (&cop, &abstract_target) in cop_positions.iter().zip(abstract_targets) {
            let mut targets = vec![abstract_target];
            let mut allowed: Option<NodeSet> = None;

            for index in (0..=start_level).rev() {
                let level = self.hierarchy.level(index);
                let position = level.abstract_node(cop);
                let path = multi_target_shortest_path(
                    &level.graph,
                    position,
                    &targets,
                    allowed.as_ref(),
                );

                if index == 0 {
                    joint_move.push(first_step_on_path(&path));
                } else {
                    let reached = *path.last().unwrap();
                    targets = level.invert_to_previous(reached).to_vec();
                    let mut corridor = NodeSet::new(self.hierarchy.level(index - 1).n_nodes());
                    for node in level.invert_nodes_to_previous(&path) {
                        corridor.insert(node);
                    }
                    allowed = Some(corridor);
                }
            }
        }

        joint_move
    }

    /// Spends leftover construction time simulating matches from the chosen
    /// placement against robber spawns biased toward cop-distant nodes. The
    /// only purpose is to prime the per-level transposition tables; results
    /// are discarded. The sample count is fixed so that, given ample time,
    /// two runs with the same seed do exactly the same work.
    fn warmup(&mut self, deadline: Deadline) {
        let literal = self.hierarchy.level(0);
        if !literal.distances.is_populated() {
            return;
        }

        let n = literal.graph.n_nodes();
        let min_cop_distance: Vec<f64> = (0..n as NodeId)
            .map(|v| {
                self.init_positions
                    .iter()
                    .map(|&cop| literal.distances.distance(v, cop))
                    .min()
                    .unwrap_or(0) as f64
            })
            .collect();

        // Softmax over distances: far corners spawn robbers more often.
        let peak = min_cop_distance.iter().fold(f64::MIN, |a, &b| a.max(b));
        let exponentials: Vec<f64> = min_cop_distance.iter().map(|&d| (d - peak).exp()).collect();
        let total: f64 = exponentials.iter().sum();
        let mut cumulative = 0.0;
        let thresholds: Vec<f64> = exponentials
            .iter()
            .map(|&e| {
                cumulative += e / total;
                cumulative
            })
            .collect();

        let init_positions = self.init_positions.clone();
        let n_samples = n.min(16);
        let mut guard = TimeoutLoop::new(deadline);
        for _ in 0..n_samples {
            let ran = guard.run(|| {
                let draw = self.rng.random::<f64>();
                let robber = thresholds
                    .iter()
                    .position(|&t| draw < t)
                    .unwrap_or(n - 1) as NodeId;
                self.warmup_refinement(init_positions.clone(), robber, deadline);
            });
            if !ran {
                break;
            }
        }
    }

    /// Plays one simulated pursuit against a motionless robber: descend the
    /// hierarchy while winning, slide every cop toward the pre-image of its
    /// abstract target, repeat until capture, a fixed point, or time.
    fn warmup_refinement(&mut self, mut cop_positions: Vec<NodeId>, robber: NodeId, deadline: Deadline) {
        let mut guard = TimeoutLoop::with_tolerance(deadline, 2.0);

        // A capture needs at most one traversal of the component; oscillating
        // plans are cut off instead of spinning until the deadline.
        let mut rounds_left = self.hierarchy.level(0).graph.n_nodes();
        while !cop_positions.contains(&robber) && rounds_left > 0 {
            rounds_left -= 1;
            let before = cop_positions.clone();
            let mut after = cop_positions.clone();

            let ran = guard.run(|| {
                let mut level = self.hierarchy.coarsest();
                loop {
                    let (joint_move, winning) =
                        self.abstract_minimax(level, &cop_positions, robber, deadline);
                    if !winning {
                        break;
                    }
                    let abstraction = self.hierarchy.level(level);
                    let distances = &self.hierarchy.level(0).distances;
                    after = cop_positions
                        .iter()
                        .zip(&joint_move)
                        .map(|(&cop, &abstract_target)| {
                            abstraction
                                .invert_node(abstract_target)
                                .iter()
                                .copied()
                                .min_by_key(|&v| (distances.distance(v, cop), v))
                                .unwrap()
                        })
                        .collect();
                    if level == 0 {
                        break;
                    }
                    level -= 1;
                }
            });

            cop_positions = after;
            if !ran || before == cop_positions {
                break;
            }
        }
    }
}

/// Fixed-width key for the probability maps: sorted cop positions, robber
/// position and level id hashed into a u64. Collisions only perturb a
/// heuristic probability, which is harmless.
fn position_key(cop_positions: &[NodeId], robber_position: NodeId, level: u32) -> u64 {
    let mut sorted = cop_positions.to_vec();
    sorted.sort_unstable();
    let mut hasher = FxHasher::default();
    sorted.hash(&mut hasher);
    robber_position.hash(&mut hasher);
    level.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod descent_tests {
    use std::time::Duration;

    use rand::SeedableRng;

    use super::*;
    use crate::graph::gen;

    fn strategy(graph: &Graph, n_cops: usize, budget_ms: u64) -> AbstractMinimaxStrategy {
        AbstractMinimaxStrategy::new(
            graph,
            n_cops,
            Deadline::after(Duration::from_millis(budget_ms)),
            SmallRng::seed_from_u64(1234),
        )
    }

    fn assert_legal(graph: &Graph, cops: &[NodeId], joint_move: &[NodeId]) {
        assert_eq!(joint_move.len(), cops.len());
        for (&cop, &step) in cops.iter().zip(joint_move) {
            assert!(step == cop || graph.has_edge(cop, step));
        }
    }

    #[test]
    fn placement_returns_the_requested_cop_count() {
        let graph = gen::petersen();
        let mut cops = strategy(&graph, 3, 600);
        let positions = cops.init();
        assert_eq!(positions.len(), 3);
        assert!(positions.iter().all(|&v| v < 10));
    }

    #[test]
    fn placement_degrades_to_gonzalez_without_stores() {
        let graph = gen::grid(5, 5);
        // No time at all: stores cannot populate, placement still works.
        let mut cops = strategy(&graph, 2, 0);
        let positions = cops.init();
        assert_eq!(positions.len(), 2);
    }

    #[test]
    fn steps_are_always_legal() {
        let graph = gen::petersen();
        let mut cops = strategy(&graph, 3, 400);
        let mut positions = cops.init();
        let mut robber = 7;
        for _ in 0..6 {
            let next = cops.step(&positions, robber, Deadline::after(Duration::from_millis(300)));
            assert_legal(&graph, &positions, &next);
            positions = next;
            if positions.contains(&robber) {
                return;
            }
            // Simple fleeing robber keeps the test honest.
            robber = graph
                .neighbors(robber)
                .iter()
                .copied()
                .chain([robber])
                .find(|&v| !positions.contains(&v))
                .unwrap_or(robber);
        }
    }

    #[test]
    fn steps_stay_legal_with_no_time_budget() {
        let graph = gen::grid(4, 4);
        let mut cops = strategy(&graph, 2, 0);
        let positions = cops.init();
        let next = cops.step(&positions, 15, Deadline::after(Duration::ZERO));
        assert_legal(&graph, &positions, &next);
    }

    #[test]
    fn cornered_robber_is_approached() {
        // On a path the descent must reduce to straight pursuit.
        let graph = gen::path(6);
        let mut cops = strategy(&graph, 1, 300);
        let next = cops.step(&[0], 5, Deadline::after(Duration::from_millis(200)));
        assert_eq!(next, vec![1]);
    }
}
