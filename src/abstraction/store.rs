use rustc_hash::FxHashMap;

use crate::graph::search::bfs_distances;
use crate::graph::{Graph, NodeId};
use crate::util::deadline::{Deadline, TimeoutLoop};

/// All-pairs shortest path lengths for one abstraction level. Population is
/// deadline-gated per source; `is_populated` only turns true once every
/// source finished, and downstream code must check it before reading.
#[derive(Default)]
pub struct ShortestPathLengthStore {
    pairwise: Vec<Vec<u32>>,
    populated: bool,
}

impl ShortestPathLengthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate(&mut self, graph: &Graph, deadline: Deadline) -> bool {
        self.pairwise = Vec::with_capacity(graph.n_nodes());
        self.populated = false;

        let mut guard = TimeoutLoop::new(deadline);
        for source in graph.nodes() {
            let ran = guard.run(|| self.pairwise.push(bfs_distances(graph, source)));
            if !ran {
                return false;
            }
        }

        self.populated = true;
        true
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn distance(&self, u: NodeId, v: NodeId) -> u32 {
        self.pairwise[u as usize][v as usize]
    }

    pub fn pairwise(&self) -> &[Vec<u32>] {
        &self.pairwise
    }
}

/// Edge ranks scoring how much of an edge's neighbourhood is *not* dominated
/// by the rest of its closed neighbourhood: `exp(-|N[w] ∩ ⋃_{u∈N[v]∖{w}}
/// N[u]|)` for the edge (v, w), symmetrised. High rank means the edge leads
/// somewhere the other neighbours do not already cover.
#[derive(Default)]
pub struct EdgeRankStore {
    ranks: FxHashMap<(NodeId, NodeId), f64>,
    populated: bool,
}

impl EdgeRankStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate(&mut self, graph: &Graph, deadline: Deadline) -> bool {
        self.ranks = FxHashMap::default();
        self.populated = false;

        let n = graph.n_nodes();
        let mut guard = TimeoutLoop::new(deadline);

        // Closed neighbourhoods first; they are read many times below.
        let mut neighborhoods: Vec<Vec<NodeId>> = Vec::with_capacity(n);
        for v in graph.nodes() {
            let ran = guard.run(|| {
                let mut closed = vec![v];
                closed.extend_from_slice(graph.neighbors(v));
                neighborhoods.push(closed);
            });
            if !ran {
                return false;
            }
        }

        // Stamp array instead of a fresh set per edge.
        let mut stamp = vec![0u32; n];
        let mut generation = 0u32;

        for v in graph.nodes() {
            let ran = guard.run(|| {
                for &w in graph.neighbors(v) {
                    generation += 1;
                    for &other in &neighborhoods[v as usize] {
                        if other == w {
                            continue;
                        }
                        for &x in &neighborhoods[other as usize] {
                            stamp[x as usize] = generation;
                        }
                    }
                    let dominated = neighborhoods[w as usize]
                        .iter()
                        .filter(|&&x| stamp[x as usize] == generation)
                        .count();
                    let rank = (-(dominated as f64)).exp();
                    self.ranks.insert((v, w), rank);
                    self.ranks.insert((w, v), rank);
                }
            });
            if !ran {
                return false;
            }
        }

        self.populated = true;
        true
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn ranks(&self) -> &FxHashMap<(NodeId, NodeId), f64> {
        &self.ranks
    }
}

#[cfg(test)]
mod store_tests {
    use std::time::Duration;

    use super::*;
    use crate::graph::gen;

    #[test]
    fn distances_populate_with_time_to_spare() {
        let graph = gen::cycle(8);
        let mut store = ShortestPathLengthStore::new();
        assert!(store.populate(&graph, Deadline::after(Duration::from_secs(5))));
        assert!(store.is_populated());
        assert_eq!(store.distance(0, 4), 4);
        assert_eq!(store.distance(1, 7), 2);
    }

    #[test]
    fn an_expired_deadline_leaves_the_flag_down() {
        let graph = gen::grid(6, 6);
        let mut store = ShortestPathLengthStore::new();
        assert!(!store.populate(&graph, Deadline::after(Duration::ZERO)));
        assert!(!store.is_populated());

        let mut ranks = EdgeRankStore::new();
        assert!(!ranks.populate(&graph, Deadline::after(Duration::ZERO)));
        assert!(!ranks.is_populated());
    }

    #[test]
    fn ranks_reward_uncovered_neighbourhoods() {
        // Path: the edge (0, 1) is barely dominated, a triangle edge is
        // fully dominated by the third corner.
        let path = gen::path(3);
        let mut store = EdgeRankStore::new();
        assert!(store.populate(&path, Deadline::after(Duration::from_secs(5))));
        let path_rank = store.ranks()[&(0, 1)];

        let triangle = gen::complete(3);
        let mut store = EdgeRankStore::new();
        assert!(store.populate(&triangle, Deadline::after(Duration::from_secs(5))));
        let triangle_rank = store.ranks()[&(0, 1)];

        assert!(path_rank > triangle_rank);
        for (&(u, v), &rank) in store.ranks() {
            assert!(rank > 0.0 && rank <= 1.0);
            assert_eq!(rank, store.ranks()[&(v, u)]);
        }
    }
}
