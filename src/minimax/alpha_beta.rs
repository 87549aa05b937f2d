use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::graph::{Graph, NodeId, NodeSet};
use crate::minimax::zobrist::{SearchMove, TranspositionTable};
use crate::util::deadline::Deadline;

pub const COP_WIN: f64 = 1.0;
pub const ROBBER_WIN: f64 = 0.0;
/// Value of a node the search had to abandon for time.
pub const TIME_EXHAUSTED: f64 = 0.5;

/// Everything constant across one minimax tree. The cops move on the full
/// level graph; the robber is confined to the effective contour subgraph;
/// fixated cops have their single predetermined step instead of a branching
/// choice.
pub struct SearchFrame<'a> {
    pub graph: &'a Graph,
    pub effective: &'a NodeSet,
    pub fixated: &'a FxHashMap<usize, NodeId>,
    pub deadline: Deadline,
}

pub fn is_terminal(cop_positions: &[NodeId], robber_position: NodeId) -> bool {
    cop_positions.contains(&robber_position)
}

/// Minimax with alpha-beta pruning in [0, 1]: 1 means the cops force a
/// capture within the remaining depth, 0 means the robber survives it.
/// Remaining depth decreases on cop moves only, so one unit of depth is one
/// full round.
///
/// Results are cached in the transposition table at their query depth; a
/// state abandoned on the deadline returns 0.5 *uncached* so a later call
/// with more time recomputes it. The deadline slack scales with the depth
/// still to unwind, since every open frame needs a moment to return.
#[allow(clippy::too_many_arguments)]
pub fn minimax_alpha_beta(
    frame: &SearchFrame,
    table: &mut TranspositionTable,
    cop_positions: &[NodeId],
    robber_position: NodeId,
    cop_turn: bool,
    remaining_depth: u32,
    mut alpha: f64,
    mut beta: f64,
) -> (SearchMove, f64) {
    if let Some((best_move, value)) = lookup(table, cop_positions, robber_position, cop_turn, remaining_depth) {
        return (best_move, value);
    }

    let mut best_move = if cop_turn {
        SearchMove::Cops(cop_positions.to_vec())
    } else {
        SearchMove::Robber(robber_position)
    };
    let mut evaluation = if cop_turn { alpha } else { beta };

    let terminal = is_terminal(cop_positions, robber_position);
    if terminal || remaining_depth == 0 {
        evaluation = if terminal { COP_WIN } else { ROBBER_WIN };
    } else if frame.deadline.remaining().as_secs_f64() <= 0.001 / (remaining_depth as f64 + 1.0) {
        return (best_move, TIME_EXHAUSTED);
    } else if cop_turn {
        for successor in cop_transitions(frame, cop_positions) {
            let (_, successor_evaluation) = minimax_alpha_beta(
                frame,
                table,
                &successor,
                robber_position,
                false,
                remaining_depth - 1,
                alpha,
                beta,
            );
            if successor_evaluation > evaluation {
                evaluation = successor_evaluation;
                best_move = SearchMove::Cops(successor);
            }
            alpha = alpha.max(evaluation);
            // The robber already has a line keeping the value below beta.
            if evaluation >= beta {
                break;
            }
        }
    } else {
        for successor in robber_transitions(frame, robber_position) {
            let (_, successor_evaluation) = minimax_alpha_beta(
                frame,
                table,
                cop_positions,
                successor,
                true,
                remaining_depth,
                alpha,
                beta,
            );
            if successor_evaluation < evaluation {
                evaluation = successor_evaluation;
                best_move = SearchMove::Robber(successor);
            }
            beta = beta.min(evaluation);
            // The cops already have a line keeping the value above alpha.
            if evaluation <= alpha {
                break;
            }
        }
    }

    table.insert(
        cop_positions,
        robber_position,
        cop_turn,
        remaining_depth,
        best_move.clone(),
        evaluation,
    );
    (best_move, evaluation)
}

fn lookup(
    table: &TranspositionTable,
    cop_positions: &[NodeId],
    robber_position: NodeId,
    cop_turn: bool,
    remaining_depth: u32,
) -> Option<(SearchMove, f64)> {
    if table.contains(cop_positions, robber_position, cop_turn, remaining_depth) {
        table
            .get(cop_positions, robber_position, cop_turn)
            .map(|(best_move, value)| (best_move.clone(), value))
    } else {
        None
    }
}

/// Joint cop successors: the Cartesian product over each free cop's
/// neighbours-or-stay, with fixated cops pinned to their predetermined step.
fn cop_transitions(frame: &SearchFrame, cop_positions: &[NodeId]) -> impl Iterator<Item = Vec<NodeId>> {
    let candidates: Vec<Vec<NodeId>> = cop_positions
        .iter()
        .enumerate()
        .map(|(slot, &position)| match frame.fixated.get(&slot) {
            Some(&step) => vec![step],
            None => {
                let mut moves = frame.graph.neighbors(position).to_vec();
                moves.push(position);
                moves
            }
        })
        .collect();

    candidates.into_iter().multi_cartesian_product()
}

/// Robber successors: stay or move to a neighbour inside the effective
/// subgraph.
fn robber_transitions(frame: &SearchFrame, robber_position: NodeId) -> Vec<NodeId> {
    let mut moves = vec![robber_position];
    moves.extend(
        frame
            .graph
            .neighbors(robber_position)
            .iter()
            .copied()
            .filter(|&v| frame.effective.contains(v)),
    );
    moves
}
