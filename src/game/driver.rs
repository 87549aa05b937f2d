use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::game::player::{CopsPlayer, MatchRules, RobberPlayer};
use crate::game::Outcome;
use crate::graph::{Graph, NodeId};
use crate::util::deadline::Deadline;

/// One recorded round of play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundRecord {
    pub robber_position: NodeId,
    pub cop_positions: Vec<NodeId>,
}

/// The match driver: owns both players, enforces the rules, and converts
/// every kind of player failure into an outcome code instead of crashing
/// the match.
///
/// Timing is cooperative. Each call gets its deadline passed in and is
/// measured against the allowed budget stretched by 5% plus 10 ms of
/// scheduling slack; engines are expected to return early on their own. An
/// overrun during placement loses the match, an overrun during a step only
/// forfeits that turn. A panicking player loses by exception.
pub struct Game {
    graph: Graph,
    rules: MatchRules,
    cops: Box<dyn CopsPlayer>,
    robber: Box<dyn RobberPlayer>,
    cop_positions: Vec<NodeId>,
    robber_position: Option<NodeId>,
    round_number: u32,
    outcome: Outcome,
    log: Vec<RoundRecord>,
}

enum CallError {
    Panicked,
    Overran,
}

fn supervised<T>(budget: Option<Duration>, call: impl FnOnce() -> T) -> Result<T, CallError> {
    let start = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(call));
    let elapsed = start.elapsed();

    match result {
        Err(_) => Err(CallError::Panicked),
        Ok(value) => match budget {
            Some(budget) if elapsed > budget.mul_f64(1.05) + Duration::from_millis(10) => {
                Err(CallError::Overran)
            }
            _ => Ok(value),
        },
    }
}

impl Game {
    /// Builds both players under init-deadline supervision; a construction
    /// overrun or panic already decides the match.
    pub fn new(
        graph: &Graph,
        rules: MatchRules,
        cops_factory: impl FnOnce(&Graph, &MatchRules) -> Box<dyn CopsPlayer>,
        robber_factory: impl FnOnce(&Graph, &MatchRules) -> Box<dyn RobberPlayer>,
    ) -> Self {
        assert!(rules.n_cops > 0, "a match needs at least one cop");
        assert!(graph.n_nodes() > 0, "a match needs a non-empty graph");

        struct Crashed;
        impl CopsPlayer for Crashed {
            fn init_positions(&mut self, _: Deadline) -> Vec<NodeId> {
                unreachable!("the match is already decided")
            }
            fn step(&mut self, _: NodeId, _: Deadline) -> Vec<NodeId> {
                unreachable!("the match is already decided")
            }
        }
        impl RobberPlayer for Crashed {
            fn init_position(&mut self, _: &[NodeId], _: Deadline) -> NodeId {
                unreachable!("the match is already decided")
            }
            fn step(&mut self, _: &[NodeId], _: Deadline) -> NodeId {
                unreachable!("the match is already decided")
            }
        }

        let mut outcome = Outcome::GameContinues;

        let cops = match supervised(rules.timeout_init, || cops_factory(graph, &rules)) {
            Ok(cops) => cops,
            Err(error) => {
                outcome = match error {
                    CallError::Panicked => Outcome::CopsException,
                    CallError::Overran => Outcome::CopsTimeout,
                };
                warn!("cops construction failed: {outcome}");
                Box::new(Crashed)
            }
        };

        let robber = if outcome.is_terminal() {
            Box::new(Crashed) as Box<dyn RobberPlayer>
        } else {
            match supervised(rules.timeout_init, || robber_factory(graph, &rules)) {
                Ok(robber) => robber,
                Err(error) => {
                    outcome = match error {
                        CallError::Panicked => Outcome::RobberException,
                        CallError::Overran => Outcome::RobberTimeout,
                    };
                    warn!("robber construction failed: {outcome}");
                    Box::new(Crashed)
                }
            }
        };

        Self {
            graph: graph.clone(),
            rules,
            cops,
            robber,
            cop_positions: Vec::new(),
            robber_position: None,
            round_number: 0,
            outcome,
            log: Vec::new(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn move_log(&self) -> &[RoundRecord] {
        &self.log
    }

    fn conclude(&mut self, outcome: Outcome) {
        if !self.outcome.is_terminal() {
            self.outcome = outcome;
            info!("round {}: {} (code {})", self.round_number, outcome, outcome.code());
        }
    }

    /// Plays the match to its end and returns the outcome.
    pub fn run(&mut self) -> Outcome {
        if !self.outcome.is_terminal() {
            self.place_players();
        }
        while !self.outcome.is_terminal() {
            self.play_round();
        }
        self.outcome
    }

    /// Placement: cops commit first, the robber places with full knowledge
    /// of them. A deadline violation here is a loss, not a forfeited turn.
    fn place_players(&mut self) {
        let deadline = self.rules.step_deadline();
        let cops = &mut self.cops;
        match supervised(self.rules.timeout_step, || cops.init_positions(deadline)) {
            Ok(placement) => {
                if !self.cop_placement_is_valid(&placement) {
                    warn!("invalid cop placement {placement:?}");
                    return self.conclude(Outcome::CopsInvalidStep);
                }
                self.cop_positions = placement;
            }
            Err(CallError::Panicked) => return self.conclude(Outcome::CopsException),
            Err(CallError::Overran) => return self.conclude(Outcome::CopsTimeout),
        }

        let deadline = self.rules.step_deadline();
        let robber = &mut self.robber;
        let cop_positions = self.cop_positions.clone();
        match supervised(self.rules.timeout_step, || robber.init_position(&cop_positions, deadline)) {
            Ok(position) => {
                if (position as usize) >= self.graph.n_nodes() {
                    warn!("robber placed outside the graph: {position}");
                    return self.conclude(Outcome::RobberInvalidStep);
                }
                self.robber_position = Some(position);
            }
            Err(CallError::Panicked) => return self.conclude(Outcome::RobberException),
            Err(CallError::Overran) => return self.conclude(Outcome::RobberTimeout),
        }

        self.log.push(RoundRecord {
            robber_position: self.robber_position.unwrap(),
            cop_positions: self.cop_positions.clone(),
        });
        self.check_round_end();
    }

    /// One round: the robber moves, the cops answer, then the terminal
    /// checks run. The round is counted as soon as the first mover's turn
    /// begins.
    fn play_round(&mut self) {
        self.round_number += 1;

        // Robber's turn. A step overrun forfeits the move only.
        let deadline = self.rules.step_deadline();
        let robber = &mut self.robber;
        let cop_positions = self.cop_positions.clone();
        match supervised(self.rules.timeout_step, || robber.step(&cop_positions, deadline)) {
            Ok(position) => {
                if !self.robber_step_is_valid(position) {
                    warn!("invalid robber step to {position}");
                    return self.conclude(Outcome::RobberInvalidStep);
                }
                self.robber_position = Some(position);
            }
            Err(CallError::Panicked) => return self.conclude(Outcome::RobberException),
            Err(CallError::Overran) => {
                warn!("robber overran its step deadline and forfeits the turn");
            }
        }

        // Cops' turn.
        let deadline = self.rules.step_deadline();
        let cops = &mut self.cops;
        let robber_position = self.robber_position.unwrap();
        match supervised(self.rules.timeout_step, || cops.step(robber_position, deadline)) {
            Ok(placement) => {
                if !self.cop_step_is_valid(&placement) {
                    warn!("invalid cop step {placement:?}");
                    return self.conclude(Outcome::CopsInvalidStep);
                }
                self.cop_positions = placement;
            }
            Err(CallError::Panicked) => return self.conclude(Outcome::CopsException),
            Err(CallError::Overran) => {
                warn!("cops overran their step deadline and forfeit the turn");
            }
        }

        self.log.push(RoundRecord {
            robber_position,
            cop_positions: self.cop_positions.clone(),
        });
        self.check_round_end();
    }

    fn check_round_end(&mut self) {
        let robber = self.robber_position.unwrap();
        if self.cop_positions.contains(&robber) {
            self.conclude(Outcome::RobberCaught);
        } else if self.rules.max_rounds.is_some_and(|cap| self.round_number >= cap) {
            self.conclude(Outcome::CopsOutOfSteps);
        }
    }

    fn cop_placement_is_valid(&self, placement: &[NodeId]) -> bool {
        placement.len() == self.rules.n_cops
            && placement.iter().all(|&v| (v as usize) < self.graph.n_nodes())
    }

    fn cop_step_is_valid(&self, placement: &[NodeId]) -> bool {
        self.cop_placement_is_valid(placement)
            && placement
                .iter()
                .zip(&self.cop_positions)
                .all(|(&next, &previous)| next == previous || self.graph.has_edge(previous, next))
    }

    fn robber_step_is_valid(&self, position: NodeId) -> bool {
        let previous = self.robber_position.unwrap();
        (position as usize) < self.graph.n_nodes()
            && (position == previous || self.graph.has_edge(previous, position))
    }
}

#[cfg(test)]
mod driver_tests {
    use super::*;
    use crate::graph::gen;

    /// Scripted players for exercising the rules without real engines.
    struct ScriptedCops {
        placement: Vec<NodeId>,
        moves: Box<dyn FnMut(NodeId, &[NodeId]) -> Vec<NodeId>>,
        positions: Vec<NodeId>,
    }

    impl ScriptedCops {
        fn stationary(placement: Vec<NodeId>) -> Self {
            Self {
                placement,
                moves: Box::new(|_, positions| positions.to_vec()),
                positions: Vec::new(),
            }
        }
    }

    impl CopsPlayer for ScriptedCops {
        fn init_positions(&mut self, _: Deadline) -> Vec<NodeId> {
            self.positions = self.placement.clone();
            self.placement.clone()
        }
        fn step(&mut self, robber: NodeId, _: Deadline) -> Vec<NodeId> {
            self.positions = (self.moves)(robber, &self.positions);
            self.positions.clone()
        }
    }

    struct ScriptedRobber {
        start: NodeId,
        moves: Box<dyn FnMut(&[NodeId], NodeId) -> NodeId>,
        position: NodeId,
    }

    impl ScriptedRobber {
        fn stationary(start: NodeId) -> Self {
            Self { start, moves: Box::new(|_, position| position), position: 0 }
        }
    }

    impl RobberPlayer for ScriptedRobber {
        fn init_position(&mut self, _: &[NodeId], _: Deadline) -> NodeId {
            self.position = self.start;
            self.start
        }
        fn step(&mut self, cops: &[NodeId], _: Deadline) -> NodeId {
            self.position = (self.moves)(cops, self.position);
            self.position
        }
    }

    fn rules(n_cops: usize, max_rounds: u32) -> MatchRules {
        MatchRules {
            n_cops,
            timeout_init: None,
            timeout_step: None,
            max_rounds: Some(max_rounds),
            seed: 1,
        }
    }

    #[test]
    fn chasing_cops_catch_a_stationary_robber() {
        let graph = gen::path(5);
        let mut game = Game::new(
            &graph,
            rules(1, 20),
            |_, _| {
                Box::new(ScriptedCops {
                    placement: vec![0],
                    moves: Box::new(|robber, positions| {
                        vec![if positions[0] < robber { positions[0] + 1 } else { positions[0] }]
                    }),
                    positions: Vec::new(),
                })
            },
            |_, _| Box::new(ScriptedRobber::stationary(4)),
        );
        assert_eq!(game.run(), Outcome::RobberCaught);
        assert_eq!(game.outcome().code(), 1);
        assert_eq!(game.round_number(), 4);
    }

    #[test]
    fn the_round_cap_hands_the_match_to_the_robber() {
        let graph = gen::cycle(6);
        let mut game = Game::new(
            &graph,
            rules(1, 3),
            |_, _| Box::new(ScriptedCops::stationary(vec![0])),
            |_, _| Box::new(ScriptedRobber::stationary(3)),
        );
        assert_eq!(game.run(), Outcome::CopsOutOfSteps);
        assert_eq!(game.round_number(), 3);
    }

    #[test]
    fn an_illegal_cop_jump_is_a_loss() {
        let graph = gen::path(6);
        let mut game = Game::new(
            &graph,
            rules(1, 10),
            |_, _| {
                Box::new(ScriptedCops {
                    placement: vec![0],
                    moves: Box::new(|robber, _| vec![robber]),
                    positions: Vec::new(),
                })
            },
            |_, _| Box::new(ScriptedRobber::stationary(5)),
        );
        assert_eq!(game.run(), Outcome::CopsInvalidStep);
    }

    #[test]
    fn a_wrong_cop_count_is_a_loss() {
        let graph = gen::path(4);
        let mut game = Game::new(
            &graph,
            rules(2, 10),
            |_, _| Box::new(ScriptedCops::stationary(vec![0])),
            |_, _| Box::new(ScriptedRobber::stationary(3)),
        );
        assert_eq!(game.run(), Outcome::CopsInvalidStep);
    }

    #[test]
    fn an_illegal_robber_teleport_is_a_loss() {
        let graph = gen::path(6);
        let mut game = Game::new(
            &graph,
            rules(1, 10),
            |_, _| Box::new(ScriptedCops::stationary(vec![0])),
            |_, _| {
                Box::new(ScriptedRobber {
                    start: 3,
                    moves: Box::new(|_, _| 5),
                    position: 0,
                })
            },
        );
        assert_eq!(game.run(), Outcome::RobberInvalidStep);
        assert_eq!(game.outcome().code(), 2);
    }

    #[test]
    fn a_panicking_player_loses_by_exception() {
        let graph = gen::path(4);
        let mut game = Game::new(
            &graph,
            rules(1, 10),
            |_, _| Box::new(ScriptedCops::stationary(vec![0])),
            |_, _| {
                Box::new(ScriptedRobber {
                    start: 3,
                    moves: Box::new(|_, _| panic!("robber engine exploded")),
                    position: 0,
                })
            },
        );
        assert_eq!(game.run(), Outcome::RobberException);
        assert_eq!(game.outcome().code(), 4);
    }

    #[test]
    fn a_suicidal_robber_is_caught_at_round_end() {
        let graph = gen::path(3);
        let mut game = Game::new(
            &graph,
            rules(1, 10),
            |_, _| Box::new(ScriptedCops::stationary(vec![1])),
            |_, _| {
                Box::new(ScriptedRobber {
                    start: 2,
                    moves: Box::new(|cops, _| cops[0]),
                    position: 0,
                })
            },
        );
        assert_eq!(game.run(), Outcome::RobberCaught);
        assert_eq!(game.round_number(), 1);
    }

    #[test]
    fn the_move_log_records_placement_and_rounds() {
        let graph = gen::path(5);
        let mut game = Game::new(
            &graph,
            rules(1, 2),
            |_, _| Box::new(ScriptedCops::stationary(vec![0])),
            |_, _| Box::new(ScriptedRobber::stationary(4)),
        );
        game.run();
        // Placement plus two played rounds.
        assert_eq!(game.move_log().len(), 3);
        assert_eq!(game.move_log()[0].cop_positions, vec![0]);
        assert_eq!(game.move_log()[0].robber_position, 4);
    }
}
