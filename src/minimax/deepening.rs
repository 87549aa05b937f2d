use rustc_hash::FxHashMap;

use crate::graph::{Graph, NodeId, NodeSet};
use crate::minimax::alpha_beta::{minimax_alpha_beta, SearchFrame, COP_WIN, ROBBER_WIN};
use crate::minimax::zobrist::{SearchMove, TranspositionTable};
use crate::util::deadline::{Deadline, TimeoutLoop};

/// Computes the next step for every cop outside the effective subgraph, given
/// their positions and the robber's. Usually disjoint-path pursuit on the
/// level graph.
pub type FixatedSteps<'a> = dyn Fn(&[NodeId], NodeId) -> Vec<NodeId> + 'a;

/// Iterative-deepening minimax on one effective subgraph: searches depths
/// `0..=max_depth`, reusing the shared transposition table, and stops early
/// on a cop win or when another iteration would blow the deadline. Returns
/// the best cop move found and whether it is winning.
///
/// Cops listed in `hidden_cops` are fixated: their step is precomputed once
/// here and substituted for their whole branching choice.
#[allow(clippy::too_many_arguments)]
pub fn iterative_deepening_minimax(
    graph: &Graph,
    effective: &NodeSet,
    cop_positions: &[NodeId],
    robber_position: NodeId,
    max_depth: u32,
    deadline: Deadline,
    table: &mut TranspositionTable,
    hidden_cops: &[usize],
    fixated_steps: &FixatedSteps,
) -> (Vec<NodeId>, bool) {
    let hidden_positions: Vec<NodeId> =
        hidden_cops.iter().map(|&slot| cop_positions[slot]).collect();
    let fixated: FxHashMap<usize, NodeId> = if hidden_cops.is_empty() {
        FxHashMap::default()
    } else {
        let steps = fixated_steps(&hidden_positions, robber_position);
        hidden_cops.iter().copied().zip(steps).collect()
    };

    let frame = SearchFrame { graph, effective, fixated: &fixated, deadline };

    let mut best_move = SearchMove::Cops(cop_positions.to_vec());
    let mut value = ROBBER_WIN;

    let mut guard = TimeoutLoop::with_tolerance(deadline, 2.0);
    for depth in 0..=max_depth {
        let ran = guard.run(|| {
            (best_move, value) = minimax_alpha_beta(
                &frame,
                table,
                cop_positions,
                robber_position,
                true,
                depth,
                0.0,
                1.0,
            );
        });
        if !ran || value == COP_WIN {
            break;
        }
    }

    let SearchMove::Cops(joint_move) = best_move else {
        unreachable!("a cop-turn search returned a robber move")
    };
    let repaired = restore_possible_move_permutation(graph, cop_positions, joint_move);
    (repaired, value == COP_WIN)
}

/// Makes a cop joint move coordinate-wise legal for the current cop order.
///
/// The transposition table is order-invariant in the cops, so a cached best
/// move may pair destinations with the wrong cop slots. If the move is not
/// already legal, a maximum bipartite matching between cop slots and move
/// slots recovers a legal permutation; one must exist whenever any
/// permutation of the move is legal, so an imperfect matching is a
/// programmer error.
pub fn restore_possible_move_permutation(
    graph: &Graph,
    cop_positions: &[NodeId],
    joint_move: Vec<NodeId>,
) -> Vec<NodeId> {
    let reachable = |slot: usize, target: NodeId| {
        target == cop_positions[slot] || graph.has_edge(cop_positions[slot], target)
    };

    if joint_move.iter().enumerate().all(|(slot, &target)| reachable(slot, target)) {
        return joint_move;
    }

    let n = cop_positions.len();
    let candidates: Vec<Vec<usize>> = (0..n)
        .map(|slot| (0..n).filter(|&j| reachable(slot, joint_move[j])).collect())
        .collect();

    // Kuhn's augmenting-path matching, cop slots against move slots.
    let mut move_of_cop = vec![usize::MAX; n];
    let mut cop_of_move = vec![usize::MAX; n];

    fn augment(
        slot: usize,
        candidates: &[Vec<usize>],
        cop_of_move: &mut [usize],
        move_of_cop: &mut [usize],
        visited: &mut [bool],
    ) -> bool {
        for &j in &candidates[slot] {
            if visited[j] {
                continue;
            }
            visited[j] = true;
            if cop_of_move[j] == usize::MAX
                || augment(cop_of_move[j], candidates, cop_of_move, move_of_cop, visited)
            {
                cop_of_move[j] = slot;
                move_of_cop[slot] = j;
                return true;
            }
        }
        false
    }

    for slot in 0..n {
        let mut visited = vec![false; n];
        let matched =
            augment(slot, &candidates, &mut cop_of_move, &mut move_of_cop, &mut visited);
        assert!(
            matched,
            "cop move {joint_move:?} admits no legal permutation from {cop_positions:?}"
        );
    }

    move_of_cop.into_iter().map(|j| joint_move[j]).collect()
}
