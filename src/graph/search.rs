use std::collections::VecDeque;

use crate::graph::{Graph, NodeId, NodeSet};

/// Sentinel distance for nodes a BFS never reached.
pub const UNREACHABLE: u32 = u32::MAX;

/// Hop distances from `source` to every node, `UNREACHABLE` where no path
/// exists.
pub fn bfs_distances(graph: &Graph, source: NodeId) -> Vec<u32> {
    let mut distances = vec![UNREACHABLE; graph.n_nodes()];
    distances[source as usize] = 0;
    let mut queue = VecDeque::from([source]);

    while let Some(node) = queue.pop_front() {
        let next = distances[node as usize] + 1;
        for &neighbor in graph.neighbors(node) {
            if distances[neighbor as usize] == UNREACHABLE {
                distances[neighbor as usize] = next;
                queue.push_back(neighbor);
            }
        }
    }

    distances
}

/// Shortest path from `source` to the nearest of `targets`, optionally
/// restricted to the subgraph induced by `allowed`.
///
/// The refinement search only ever asks for paths it knows exist (the coarse
/// path it is refining witnessed one), so a miss here is a programmer error
/// and panics rather than degrading.
pub fn multi_target_shortest_path(
    graph: &Graph,
    source: NodeId,
    targets: &[NodeId],
    allowed: Option<&NodeSet>,
) -> Vec<NodeId> {
    path_to_any(graph, source, targets, allowed).unwrap_or_else(|| {
        panic!("no path from {source} to any of {targets:?} in the restricted graph")
    })
}

/// Fallible variant of [`multi_target_shortest_path`] for callers that have a
/// legal answer of their own when no path exists.
pub fn path_to_any(
    graph: &Graph,
    source: NodeId,
    targets: &[NodeId],
    allowed: Option<&NodeSet>,
) -> Option<Vec<NodeId>> {
    let permitted = |v: NodeId| allowed.map_or(true, |set| set.contains(v));
    if !permitted(source) {
        return None;
    }

    let mut is_target = vec![false; graph.n_nodes()];
    for &t in targets {
        is_target[t as usize] = true;
    }

    let mut predecessor = vec![NodeId::MAX; graph.n_nodes()];
    let mut visited = vec![false; graph.n_nodes()];
    visited[source as usize] = true;
    let mut queue = VecDeque::from([source]);

    while let Some(node) = queue.pop_front() {
        if is_target[node as usize] {
            return Some(trace_path(&predecessor, source, node));
        }
        for &neighbor in graph.neighbors(node) {
            if !visited[neighbor as usize] && permitted(neighbor) {
                visited[neighbor as usize] = true;
                predecessor[neighbor as usize] = node;
                queue.push_back(neighbor);
            }
        }
    }

    None
}

fn trace_path(predecessor: &[NodeId], source: NodeId, target: NodeId) -> Vec<NodeId> {
    let mut path = vec![target];
    let mut node = target;
    while node != source {
        node = predecessor[node as usize];
        path.push(node);
    }
    path.reverse();
    path
}

/// Last node visited by a multi-source BFS, i.e. a node at maximum distance
/// from every source. Ties resolve to the largest node reached last in BFS
/// order, which is deterministic for sorted adjacency.
pub fn farthest_node(graph: &Graph, sources: &[NodeId]) -> NodeId {
    assert!(!sources.is_empty(), "farthest node needs at least one source");
    let mut visited = vec![false; graph.n_nodes()];
    let mut queue = VecDeque::new();
    for &s in sources {
        if !visited[s as usize] {
            visited[s as usize] = true;
            queue.push_back(s);
        }
    }

    let mut last = sources[0];
    while let Some(node) = queue.pop_front() {
        last = node;
        for &neighbor in graph.neighbors(node) {
            if !visited[neighbor as usize] {
                visited[neighbor as usize] = true;
                queue.push_back(neighbor);
            }
        }
    }

    last
}

/// The cop's move along `path`: its second node, or the only node when the
/// path is already at its destination.
pub fn first_step_on_path(path: &[NodeId]) -> NodeId {
    if path.len() <= 1 {
        path[0]
    } else {
        path[1]
    }
}
