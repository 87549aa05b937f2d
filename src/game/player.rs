use std::time::Duration;

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::graph::{Graph, NodeId};
use crate::islands::{allocate_cops, component_cop_distribution, split_components, Component};
use crate::strategy::contour::ContourRelaxationStrategy;
use crate::strategy::descent::AbstractMinimaxStrategy;
use crate::util::deadline::Deadline;

/// Budgets assumed when the driver imposes none; generous enough that
/// construction-time warmup never becomes the bottleneck of a casual match.
pub const DEFAULT_INIT_BUDGET: Duration = Duration::from_secs(600);
pub const DEFAULT_STEP_BUDGET: Duration = Duration::from_secs(60);

/// Match parameters handed to both players at construction.
#[derive(Clone, Copy, Debug)]
pub struct MatchRules {
    pub n_cops: usize,
    pub timeout_init: Option<Duration>,
    pub timeout_step: Option<Duration>,
    pub max_rounds: Option<u32>,
    /// Root seed for Zobrist keys and every stochastic decision; one seed
    /// reproduces a whole match.
    pub seed: u64,
}

impl MatchRules {
    pub fn init_deadline(&self) -> Deadline {
        Deadline::after(self.timeout_init.unwrap_or(DEFAULT_INIT_BUDGET))
    }

    pub fn step_deadline(&self) -> Deadline {
        Deadline::after(self.timeout_step.unwrap_or(DEFAULT_STEP_BUDGET))
    }
}

/// The cops' side of the player contract (§ external interfaces): place
/// once, then produce one joint move per round, always within the deadline.
pub trait CopsPlayer {
    fn init_positions(&mut self, deadline: Deadline) -> Vec<NodeId>;
    fn step(&mut self, robber_position: NodeId, deadline: Deadline) -> Vec<NodeId>;
}

/// The robber's side of the player contract.
pub trait RobberPlayer {
    fn init_position(&mut self, cop_positions: &[NodeId], deadline: Deadline) -> NodeId;
    fn step(&mut self, cop_positions: &[NodeId], deadline: Deadline) -> NodeId;
}

/// The cops' island orchestrator: distributes the force over connected
/// components, runs one descent strategy per garrisoned island, and only
/// ever moves the island the robber is on.
pub struct Cops {
    components: Vec<Component>,
    membership: Vec<usize>,
    allocation: Vec<usize>,
    strategies: Vec<Option<AbstractMinimaxStrategy>>,
    /// Current positions per component, in global ids.
    positions: Vec<Vec<NodeId>>,
    rng: SmallRng,
}

impl Cops {
    /// Construction runs the heavy warmup: hierarchies, stores and primed
    /// transposition tables per island, under 85% of the init budget split
    /// by island size.
    pub fn new(graph: &Graph, rules: &MatchRules) -> Self {
        let deadline = rules.init_deadline();
        let (components, membership) = split_components(graph);
        let proportions = component_cop_distribution(&components);
        let allocation = allocate_cops(&components, &proportions, rules.n_cops);
        info!(
            "{} cops over {} islands: {:?}",
            rules.n_cops,
            components.len(),
            allocation
        );

        let mut rng = SmallRng::seed_from_u64(rules.seed);
        let n_nodes: usize = graph.n_nodes();
        let slice_deadlines = deadline
            .fraction(0.85)
            .split(&components.iter().map(|c| c.n_nodes() as f64 / n_nodes as f64).collect::<Vec<_>>());

        let strategies = components
            .iter()
            .zip(&allocation)
            .zip(slice_deadlines)
            .map(|((component, &n_cops), slice)| {
                // Islands without a garrison need no plan.
                (n_cops > 0).then(|| {
                    AbstractMinimaxStrategy::new(
                        &component.graph,
                        n_cops,
                        slice,
                        SmallRng::seed_from_u64(rng.random()),
                    )
                })
            })
            .collect();

        let positions = vec![Vec::new(); components.len()];
        Self { components, membership, allocation, strategies, positions, rng }
    }

    fn chained_positions(&self) -> Vec<NodeId> {
        self.positions.iter().flatten().copied().collect()
    }
}

impl CopsPlayer for Cops {
    fn init_positions(&mut self, _deadline: Deadline) -> Vec<NodeId> {
        for (index, component) in self.components.iter().enumerate() {
            let n_cops = self.allocation[index];

            if n_cops >= component.n_nodes() {
                // Saturated island: cover everything, duplicate at random.
                let mut placement = component.to_global.clone();
                while placement.len() < n_cops {
                    placement.push(component.to_global[self.rng.random_range(0..component.n_nodes())]);
                }
                self.positions[index] = placement;
            } else if n_cops > 0 {
                let strategy = self.strategies[index].as_mut().unwrap();
                self.positions[index] = strategy
                    .init()
                    .into_iter()
                    .map(|local| component.to_global[local as usize])
                    .collect();
            } else {
                self.positions[index] = Vec::new();
            }
        }

        self.chained_positions()
    }

    fn step(&mut self, robber_position: NodeId, deadline: Deadline) -> Vec<NodeId> {
        let island = self.membership[robber_position as usize];
        let component = &self.components[island];

        let caught = self.positions[island].contains(&robber_position);
        if !caught {
            if let Some(strategy) = self.strategies[island].as_mut() {
                let local_cops: Vec<NodeId> = self.positions[island]
                    .iter()
                    .map(|&global| component.to_local(global).unwrap())
                    .collect();
                let local_robber = component.to_local(robber_position).unwrap();
                self.positions[island] = strategy
                    .step(&local_cops, local_robber, deadline.fraction(0.75))
                    .into_iter()
                    .map(|local| component.to_global[local as usize])
                    .collect();
            } else {
                debug!("robber is on an island without cops; nobody moves");
            }
        }

        self.chained_positions()
    }
}

/// The robber's island orchestrator: pick the most weakly covered island,
/// then play contour relaxation inside it.
pub struct Robber {
    components: Vec<Component>,
    membership: Vec<usize>,
    proportions: Vec<f64>,
    strategies: Vec<ContourRelaxationStrategy>,
    position: Option<NodeId>,
}

impl Robber {
    pub fn new(graph: &Graph, rules: &MatchRules) -> Self {
        let deadline = rules.init_deadline();
        let (components, membership) = split_components(graph);
        let proportions = component_cop_distribution(&components);

        let mut rng = SmallRng::seed_from_u64(rules.seed);
        let n_nodes: usize = graph.n_nodes();
        let slice_deadlines = deadline
            .fraction(0.85)
            .split(&components.iter().map(|c| c.n_nodes() as f64 / n_nodes as f64).collect::<Vec<_>>());

        let strategies = components
            .iter()
            .zip(slice_deadlines)
            .map(|(component, slice)| {
                ContourRelaxationStrategy::new(
                    &component.graph,
                    slice,
                    SmallRng::seed_from_u64(rng.random()),
                )
            })
            .collect();

        Self { components, membership, proportions, strategies, position: None }
    }

    fn local_cops(&self, island: usize, cop_positions: &[NodeId]) -> Vec<NodeId> {
        cop_positions
            .iter()
            .filter(|&&cop| self.membership[cop as usize] == island)
            .map(|&cop| self.components[island].to_local(cop).unwrap())
            .collect()
    }
}

impl RobberPlayer for Robber {
    fn init_position(&mut self, cop_positions: &[NodeId], _deadline: Deadline) -> NodeId {
        let mut cops_per_island = vec![0usize; self.components.len()];
        for &cop in cop_positions {
            cops_per_island[self.membership[cop as usize]] += 1;
        }

        // A cop-free island is a guaranteed draw-out; the smallest node id
        // keeps the choice deterministic.
        let position = if let Some(island) = cops_per_island.iter().position(|&n| n == 0) {
            self.components[island].to_global[0]
        } else {
            let island = (0..self.components.len())
                .min_by(|&a, &b| {
                    let coverage_a = cops_per_island[a] as f64 / (self.proportions[a] + 1e-9);
                    let coverage_b = cops_per_island[b] as f64 / (self.proportions[b] + 1e-9);
                    coverage_a.partial_cmp(&coverage_b).unwrap().then(a.cmp(&b))
                })
                .unwrap();

            let local_cops = self.local_cops(island, cop_positions);
            let local = self.strategies[island].init(&local_cops);
            self.components[island].to_global[local as usize]
        };

        self.position = Some(position);
        position
    }

    fn step(&mut self, cop_positions: &[NodeId], deadline: Deadline) -> NodeId {
        let position = self.position.expect("step before initial placement");
        let island = self.membership[position as usize];
        let local_cops = self.local_cops(island, cop_positions);

        if local_cops.is_empty() {
            return position;
        }

        let component = &self.components[island];
        let local_robber = component.to_local(position).unwrap();
        let local_next = self.strategies[island].step(
            &local_cops,
            local_robber,
            deadline.fraction(0.85),
        );
        let next = component.to_global[local_next as usize];
        self.position = Some(next);
        next
    }
}

#[cfg(test)]
mod player_tests {
    use super::*;
    use crate::graph::{gen, Graph};

    fn rules(n_cops: usize) -> MatchRules {
        MatchRules {
            n_cops,
            timeout_init: Some(Duration::from_millis(800)),
            timeout_step: Some(Duration::from_millis(300)),
            max_rounds: Some(50),
            seed: 99,
        }
    }

    fn two_triangles() -> Graph {
        Graph::from_edges(6, &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)])
    }

    #[test]
    fn cops_garrison_every_island() {
        let graph = two_triangles();
        let rules = rules(2);
        let mut cops = Cops::new(&graph, &rules);
        let placement = cops.init_positions(rules.step_deadline());
        assert_eq!(placement.len(), 2);
        assert!(placement[0] < 3);
        assert!(placement[1] >= 3);
    }

    #[test]
    fn only_the_robber_island_moves() {
        let graph = two_triangles();
        let rules = rules(2);
        let mut cops = Cops::new(&graph, &rules);
        let placement = cops.init_positions(rules.step_deadline());
        let robber = 4;
        let next = cops.step(robber, rules.step_deadline());
        assert_eq!(next[0], placement[0], "the cop on the other island must stand still");
        assert!(next[1] == placement[1] || graph.has_edge(placement[1], next[1]));
    }

    #[test]
    fn saturated_islands_are_covered_entirely() {
        let graph = Graph::from_edges(4, &[(0, 1), (2, 3)]);
        let rules = rules(5);
        let mut cops = Cops::new(&graph, &rules);
        let placement = cops.init_positions(rules.step_deadline());
        assert_eq!(placement.len(), 5);
        for v in graph.nodes() {
            assert!(placement.contains(&v), "node {v} is uncovered");
        }
    }

    #[test]
    fn robber_prefers_a_cop_free_island() {
        let graph = two_triangles();
        let rules = rules(1);
        let mut robber = Robber::new(&graph, &rules);
        // Only island 0 holds a cop.
        let position = robber.init_position(&[0], rules.step_deadline());
        assert_eq!(position, 3);
        // With no cop on its island the robber has no reason to move.
        assert_eq!(robber.step(&[0], rules.step_deadline()), 3);
    }

    #[test]
    fn robber_flees_inside_its_island() {
        let graph = gen::path(7);
        let rules = rules(1);
        let mut robber = Robber::new(&graph, &rules);
        let position = robber.init_position(&[0], rules.step_deadline());
        assert_eq!(position, 6);
        let next = robber.step(&[5], rules.step_deadline());
        assert!(next == 6 || graph.has_edge(6, next));
    }
}
