use rand::rngs::SmallRng;
use rand::Rng;
use rustc_hash::FxHashSet;

use crate::graph::{Graph, NodeId};

/// Path graph P_n: `0 - 1 - … - n-1`.
pub fn path(n: usize) -> Graph {
    let edges: Vec<_> = (1..n as NodeId).map(|v| (v - 1, v)).collect();
    Graph::from_edges(n, &edges)
}

/// Cycle graph C_n.
pub fn cycle(n: usize) -> Graph {
    assert!(n >= 3, "a cycle needs at least 3 nodes, got {n}");
    let edges: Vec<_> = (0..n as NodeId).map(|v| (v, (v + 1) % n as NodeId)).collect();
    Graph::from_edges(n, &edges)
}

/// Complete graph K_n.
pub fn complete(n: usize) -> Graph {
    let mut edges = Vec::new();
    for u in 0..n as NodeId {
        for v in u + 1..n as NodeId {
            edges.push((u, v));
        }
    }
    Graph::from_edges(n, &edges)
}

/// Rectangular grid graph with `width * height` nodes, row-major ids.
pub fn grid(width: usize, height: usize) -> Graph {
    let id = |x: usize, y: usize| (y * width + x) as NodeId;
    let mut edges = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if x + 1 < width {
                edges.push((id(x, y), id(x + 1, y)));
            }
            if y + 1 < height {
                edges.push((id(x, y), id(x, y + 1)));
            }
        }
    }
    Graph::from_edges(width * height, &edges)
}

/// The Petersen graph: outer 5-cycle 0..5, inner pentagram 5..10, spokes
/// between them.
pub fn petersen() -> Graph {
    let mut edges = Vec::new();
    for i in 0..5u32 {
        edges.push((i, (i + 1) % 5));
        edges.push((i, i + 5));
        edges.push((i + 5, (i + 2) % 5 + 5));
    }
    Graph::from_edges(10, &edges)
}

/// Uniform random G(n, m) graph: exactly `m` distinct edges sampled uniformly
/// from all node pairs. Deterministic for a given rng state.
pub fn gnm_random(n: usize, m: usize, rng: &mut SmallRng) -> Graph {
    let max_edges = n * (n - 1) / 2;
    assert!(m <= max_edges, "G({n}, {m}) asks for more edges than {max_edges} pairs");

    let mut chosen = FxHashSet::default();
    let mut edges = Vec::with_capacity(m);
    while edges.len() < m {
        let u = rng.random_range(0..n as NodeId);
        let v = rng.random_range(0..n as NodeId);
        if u == v {
            continue;
        }
        let key = (u.min(v), u.max(v));
        if chosen.insert(key) {
            edges.push(key);
        }
    }

    Graph::from_edges(n, &edges)
}

#[cfg(test)]
mod gen_tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn petersen_is_cubic() {
        let g = petersen();
        assert_eq!(g.n_nodes(), 10);
        assert_eq!(g.n_edges(), 15);
        assert!(g.nodes().all(|v| g.degree(v) == 3));
        assert_eq!(g.connected_components().len(), 1);
    }

    #[test]
    fn grid_shape() {
        let g = grid(4, 4);
        assert_eq!(g.n_nodes(), 16);
        assert_eq!(g.n_edges(), 24);
        // corner, edge, interior degrees
        assert_eq!(g.degree(0), 2);
        assert_eq!(g.degree(1), 3);
        assert_eq!(g.degree(5), 4);
    }

    #[test]
    fn gnm_is_reproducible() {
        let a = gnm_random(40, 120, &mut SmallRng::seed_from_u64(7));
        let b = gnm_random(40, 120, &mut SmallRng::seed_from_u64(7));
        assert_eq!(a.n_edges(), 120);
        assert!(a.nodes().all(|v| a.neighbors(v) == b.neighbors(v)));
    }
}
