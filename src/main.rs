use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use dragnet::baseline::cops::NaiveCops;
use dragnet::baseline::robber::NaiveRobber;
use dragnet::game::driver::Game;
use dragnet::game::player::{Cops, MatchRules, Robber};
use dragnet::graph::{gen, json, Graph};

/// Plays one game of cops and robbers between two engines.
#[derive(Parser)]
#[command(name = "dragnet", about = "cops-and-robbers pursuit engine")]
struct Args {
    /// Node-link JSON graph file to play on.
    #[arg(long, conflicts_with = "generator")]
    graph: Option<PathBuf>,

    /// Generated graph: petersen, path:N, cycle:N, grid:WxH, complete:N or
    /// gnm:N:M.
    #[arg(long, default_value = "petersen")]
    generator: String,

    #[arg(long, default_value_t = 3)]
    cops: usize,

    #[arg(long, default_value_t = 100)]
    max_rounds: u32,

    /// Construction budget per player, in seconds.
    #[arg(long)]
    timeout_init: Option<f64>,

    /// Per-move budget, in seconds.
    #[arg(long)]
    timeout_step: Option<f64>,

    /// Root seed for Zobrist keys and all stochastic decisions.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = PlayerKind::Engine)]
    cops_player: PlayerKind,

    #[arg(long, value_enum, default_value_t = PlayerKind::Engine)]
    robber_player: PlayerKind,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlayerKind {
    /// The abstraction/minimax engine (contour relaxation for the robber).
    Engine,
    /// The naive reference opponent.
    Naive,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.cops == 0 {
        bail!("the game needs at least one cop");
    }

    let graph = match &args.graph {
        Some(path) => json::load_node_link(path)?.graph,
        None => generate(&args.generator, args.seed)?,
    };
    if graph.n_nodes() == 0 {
        bail!("the graph has no nodes to play on");
    }

    let rules = MatchRules {
        n_cops: args.cops,
        timeout_init: args.timeout_init.map(Duration::from_secs_f64),
        timeout_step: args.timeout_step.map(Duration::from_secs_f64),
        max_rounds: Some(args.max_rounds),
        seed: args.seed,
    };

    let cops_kind = args.cops_player;
    let robber_kind = args.robber_player;
    let mut game = Game::new(
        &graph,
        rules,
        move |g, r| match cops_kind {
            PlayerKind::Engine => Box::new(Cops::new(g, r)),
            PlayerKind::Naive => Box::new(NaiveCops::new(g, r)),
        },
        move |g, r| match robber_kind {
            PlayerKind::Engine => Box::new(Robber::new(g, r)),
            PlayerKind::Naive => Box::new(NaiveRobber::new(g, r)),
        },
    );

    let outcome = game.run();
    for (round, record) in game.move_log().iter().enumerate() {
        log::info!(
            "round {round}: robber {} cops {:?}",
            record.robber_position,
            record.cop_positions
        );
    }
    println!(
        "{} (code {}) after {} rounds",
        outcome,
        outcome.code(),
        game.round_number()
    );

    Ok(())
}

/// Parses generator specs like `cycle:10`, `grid:4x4` or `gnm:40:120`.
fn generate(spec: &str, seed: u64) -> Result<Graph> {
    let mut parts = spec.split(':');
    let kind = parts.next().unwrap_or_default();

    let graph = match kind {
        "petersen" => gen::petersen(),
        "path" => gen::path(parse_number(parts.next(), spec, "length")?),
        "cycle" => gen::cycle(parse_number(parts.next(), spec, "length")?),
        "complete" => gen::complete(parse_number(parts.next(), spec, "size")?),
        "grid" => {
            let dimensions = parts.next().context("grid generator needs WxH")?;
            let (width, height) =
                dimensions.split_once('x').context("grid generator needs WxH")?;
            gen::grid(
                width.parse().context("bad grid width")?,
                height.parse().context("bad grid height")?,
            )
        }
        "gnm" => {
            let n = parse_number(parts.next(), spec, "node count")?;
            let m = parse_number(parts.next(), spec, "edge count")?;
            gen::gnm_random(n, m, &mut SmallRng::seed_from_u64(seed))
        }
        other => bail!("unknown generator {other}"),
    };

    Ok(graph)
}

fn parse_number(part: Option<&str>, spec: &str, what: &str) -> Result<usize> {
    part.with_context(|| format!("generator {spec} is missing its {what}"))?
        .parse()
        .with_context(|| format!("bad {what} in generator {spec}"))
}
