//! End-to-end matches through the driver, engine against engine unless a
//! scenario says otherwise.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use dragnet::baseline::cops::NaiveCops;
use dragnet::game::driver::Game;
use dragnet::game::player::{Cops, CopsPlayer, MatchRules, Robber};
use dragnet::game::Outcome;
use dragnet::graph::{gen, Graph, NodeId};
use dragnet::util::deadline::Deadline;

fn rules(
    n_cops: usize,
    max_rounds: u32,
    timeout_init: Option<Duration>,
    timeout_step: Option<Duration>,
    seed: u64,
) -> MatchRules {
    MatchRules { n_cops, timeout_init, timeout_step, max_rounds: Some(max_rounds), seed }
}

fn engine_match(graph: &Graph, rules: MatchRules) -> Game {
    Game::new(
        graph,
        rules,
        |g, r| Box::new(Cops::new(g, r)),
        |g, r| Box::new(Robber::new(g, r)),
    )
}

#[test]
fn scenario_a_petersen_three_cops() {
    let graph = gen::petersen();
    let mut game = engine_match(&graph, rules(3, 15, None, None, 7));
    assert_eq!(game.run(), Outcome::RobberCaught);
    assert!(game.round_number() <= 15);
}

#[test]
fn scenario_b_cycle_ten_two_cops() {
    let graph = gen::cycle(10);
    let mut game = engine_match(&graph, rules(2, 10, None, None, 11));
    assert_eq!(game.run(), Outcome::RobberCaught);
    assert!(game.round_number() <= 10);
}

#[test]
fn scenario_c_two_triangles_one_cop_each() {
    let graph = Graph::from_edges(6, &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)]);
    let mut game = engine_match(&graph, rules(2, 10, None, None, 3));
    assert_eq!(game.run(), Outcome::RobberCaught);
    assert!(game.round_number() <= 3);
}

#[test]
fn scenario_d_path_five_single_cop() {
    let graph = gen::path(5);
    let mut game = engine_match(&graph, rules(1, 10, None, None, 5));
    assert_eq!(game.run(), Outcome::RobberCaught);
    assert!(game.round_number() <= 4);
}

/// Wraps a cops player and records the wall-clock cost of every step call.
struct TimedCops {
    inner: Box<dyn CopsPlayer>,
    step_durations: Arc<Mutex<Vec<Duration>>>,
}

impl CopsPlayer for TimedCops {
    fn init_positions(&mut self, deadline: Deadline) -> Vec<NodeId> {
        self.inner.init_positions(deadline)
    }

    fn step(&mut self, robber_position: NodeId, deadline: Deadline) -> Vec<NodeId> {
        let start = Instant::now();
        let result = self.inner.step(robber_position, deadline);
        self.step_durations.lock().unwrap().push(start.elapsed());
        result
    }
}

#[test]
fn scenario_e_grid_within_step_deadline() {
    let graph = gen::grid(4, 4);
    let step_budget = Duration::from_millis(500);
    let durations = Arc::new(Mutex::new(Vec::new()));
    let recorded = durations.clone();

    let mut game = Game::new(
        &graph,
        rules(3, 20, Some(Duration::from_secs(2)), Some(step_budget), 13),
        move |g, r| {
            Box::new(TimedCops { inner: Box::new(Cops::new(g, r)), step_durations: recorded })
        },
        |g, r| Box::new(Robber::new(g, r)),
    );

    assert_eq!(game.run(), Outcome::RobberCaught);
    assert!(game.round_number() <= 20);

    // The driver's stretched budget plus scheduling slack; anything beyond
    // this means the engine lost deadline discipline.
    let tolerance = step_budget.mul_f64(1.05) + Duration::from_millis(260);
    for &duration in durations.lock().unwrap().iter() {
        assert!(duration <= tolerance, "a cop step took {duration:?}");
    }
}

#[test]
fn scenario_f_seeded_engine_match_reproduces() {
    // Small enough that every search and every warmup sample runs to
    // completion, so wall-clock jitter cannot change the trace.
    let graph = gen::petersen();
    let play = || {
        let mut game = engine_match(&graph, rules(3, 15, None, None, 21));
        let outcome = game.run();
        (outcome, game.move_log().to_vec())
    };

    let (first_outcome, first_log) = play();
    let (second_outcome, second_log) = play();
    assert_eq!(first_outcome, second_outcome);
    assert_eq!(first_log, second_log);
}

#[test]
fn scenario_f_seeded_random_graph_reproduces() {
    let graph = gen::gnm_random(40, 120, &mut SmallRng::seed_from_u64(40));
    let play = || {
        let mut game = Game::new(
            &graph,
            rules(3, 25, None, None, 17),
            |g, r| Box::new(NaiveCops::new(g, r)),
            |g, r| Box::new(Robber::new(g, r)),
        );
        let outcome = game.run();
        (outcome, game.move_log().to_vec())
    };

    let (first_outcome, first_log) = play();
    let (second_outcome, second_log) = play();
    assert_eq!(first_outcome, second_outcome);
    assert_eq!(first_log, second_log);
    assert!(!first_log.is_empty());
}

#[test]
fn adversarial_random_graph_respects_step_deadlines() {
    let graph = gen::gnm_random(150, 450, &mut SmallRng::seed_from_u64(8));
    let step_budget = Duration::from_millis(350);
    let durations = Arc::new(Mutex::new(Vec::new()));
    let recorded = durations.clone();

    let mut game = Game::new(
        &graph,
        rules(4, 6, Some(Duration::from_secs(3)), Some(step_budget), 2),
        move |g, r| {
            Box::new(TimedCops { inner: Box::new(Cops::new(g, r)), step_durations: recorded })
        },
        |g, r| Box::new(Robber::new(g, r)),
    );

    let outcome = game.run();
    // However the chase ends, it must end by the rules, not by a violation.
    assert!(matches!(outcome, Outcome::RobberCaught | Outcome::CopsOutOfSteps));

    let tolerance = step_budget.mul_f64(1.05) + Duration::from_millis(300);
    let durations = durations.lock().unwrap();
    assert!(!durations.is_empty());
    for &duration in durations.iter() {
        assert!(duration <= tolerance, "a cop step took {duration:?}");
    }
}
