use std::cmp::Reverse;

use float_ord::FloatOrd;
use rand::rngs::SmallRng;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::graph::search::farthest_node;
use crate::graph::{Graph, NodeId};

/// Gonzalez 2-approximation for the unweighted vertex k-center problem:
/// start at the max-degree node, then repeatedly add the node farthest from
/// every chosen center. Repeats centers when k exceeds the node count.
pub fn gonzalez_k_center(graph: &Graph, k: usize) -> Vec<NodeId> {
    assert!(graph.n_nodes() > 0, "k-center of an empty graph");
    let mut centers = vec![graph.max_degree_node()];
    while centers.len() < k {
        centers.push(farthest_node(graph, &centers));
    }
    centers
}

/// Greedy cover for one candidate radius `d` of the weighted k-center
/// problem: pick the highest-weight uncovered node as a center and discard
/// everything within `2d` of it. Stops early once `upper_bound` centers have
/// been exceeded, in which case the 2-approximation guarantee is void.
pub fn greedy_weighted_k_center(
    pairwise_distances: &[Vec<u32>],
    weights: &[f64],
    d: u32,
    upper_bound: usize,
) -> Vec<NodeId> {
    let n = weights.len();
    let mut remaining = vec![true; n];
    let mut n_remaining = n;
    let mut centers = Vec::new();

    while n_remaining > 0 {
        let center = (0..n as NodeId)
            .filter(|&v| remaining[v as usize])
            .max_by_key(|&v| (FloatOrd(weights[v as usize]), Reverse(v)))
            .unwrap();
        centers.push(center);

        if centers.len() > upper_bound {
            break;
        }

        for v in 0..n {
            if remaining[v] && pairwise_distances[center as usize][v] <= 2 * d {
                remaining[v] = false;
                n_remaining -= 1;
            }
        }
    }

    centers
}

/// Wang–Cheng 2-approximation for the weighted vertex k-center problem:
/// sweep candidate radii drawn from the occurring pairwise distances and
/// accept the first whose greedy cover needs at most k centers. Short
/// solutions are padded with the smallest-total-distance nodes and finally
/// with random duplicates.
pub fn wang_cheng_weighted_k_center(
    graph: &Graph,
    pairwise_distances: &[Vec<u32>],
    weights: &[f64],
    k: usize,
    rng: &mut SmallRng,
) -> Vec<NodeId> {
    let mut radii: Vec<u32> =
        pairwise_distances.iter().flatten().copied().filter(|&d| d != u32::MAX).collect();
    radii.sort_unstable();
    radii.dedup();

    let mut centers = Vec::new();
    for d in radii {
        let greedy = greedy_weighted_k_center(pairwise_distances, weights, d, k);
        if greedy.len() <= k {
            centers = greedy;
            break;
        }
    }

    if centers.len() < k && graph.n_nodes() > 0 {
        let total_distance = |v: NodeId| -> u64 {
            pairwise_distances[v as usize].iter().map(|&d| d as u64).sum()
        };
        let mut fill: Vec<NodeId> =
            graph.nodes().filter(|v| !centers.contains(v)).collect();
        fill.sort_by_key(|&v| (total_distance(v), v));
        fill.truncate(k - centers.len());
        centers.extend(fill);

        while centers.len() < k {
            let duplicate = centers[rng.random_range(0..centers.len())];
            centers.push(duplicate);
        }
    }

    centers
}

const PAGERANK_DAMPING: f64 = 0.85;
const PAGERANK_MAX_ITERATIONS: usize = 100;
const PAGERANK_TOLERANCE: f64 = 1e-6;

/// Weighted PageRank by power iteration. Edge weights are looked up
/// symmetrically; nodes whose incident weights sum to zero spread their mass
/// uniformly. Returns None when the iteration fails to converge so the
/// caller can fall back to degree weighting.
pub fn pagerank(graph: &Graph, edge_weights: &FxHashMap<(NodeId, NodeId), f64>) -> Option<Vec<f64>> {
    let n = graph.n_nodes();
    if n == 0 {
        return Some(Vec::new());
    }

    let weight = |u: NodeId, v: NodeId| edge_weights.get(&(u, v)).copied().unwrap_or(0.0);
    let out_weight: Vec<f64> = graph
        .nodes()
        .map(|u| graph.neighbors(u).iter().map(|&v| weight(u, v)).sum())
        .collect();

    let uniform = 1.0 / n as f64;
    let mut ranks = vec![uniform; n];

    for _ in 0..PAGERANK_MAX_ITERATIONS {
        let mut next = vec![0.0; n];
        let mut dangling_mass = 0.0;

        for u in graph.nodes() {
            let mass = ranks[u as usize];
            if out_weight[u as usize] > 0.0 {
                for &v in graph.neighbors(u) {
                    next[v as usize] += mass * weight(u, v) / out_weight[u as usize];
                }
            } else {
                dangling_mass += mass;
            }
        }

        let base = (1.0 - PAGERANK_DAMPING) * uniform + PAGERANK_DAMPING * dangling_mass * uniform;
        for value in &mut next {
            *value = PAGERANK_DAMPING * *value + base;
        }

        let err: f64 = next.iter().zip(&ranks).map(|(a, b)| (a - b).abs()).sum();
        ranks = next;
        if err < n as f64 * PAGERANK_TOLERANCE {
            return Some(ranks);
        }
    }

    None
}

#[cfg(test)]
mod approx_tests {
    use rand::SeedableRng;

    use super::*;
    use crate::graph::gen;
    use crate::graph::search::bfs_distances;

    fn all_pairs(graph: &Graph) -> Vec<Vec<u32>> {
        graph.nodes().map(|v| bfs_distances(graph, v)).collect()
    }

    fn coverage_radius(distances: &[Vec<u32>], centers: &[NodeId]) -> u32 {
        (0..distances.len())
            .map(|v| centers.iter().map(|&c| distances[c as usize][v]).min().unwrap())
            .max()
            .unwrap()
    }

    fn brute_force_radius(distances: &[Vec<u32>], k: usize) -> u32 {
        let n = distances.len();
        assert_eq!(k, 2, "brute force only written for pairs");
        let mut best = u32::MAX;
        for a in 0..n as NodeId {
            for b in a..n as NodeId {
                best = best.min(coverage_radius(distances, &[a, b]));
            }
        }
        best
    }

    #[test]
    fn gonzalez_covers_a_cycle() {
        let graph = gen::cycle(8);
        let distances = all_pairs(&graph);
        let centers = gonzalez_k_center(&graph, 2);
        assert_eq!(centers.len(), 2);
        // optimum radius is 2; the approximation must stay within twice that
        assert!(coverage_radius(&distances, &centers) <= 4);
    }

    #[test]
    fn wang_cheng_on_a_cycle_is_optimal() {
        let graph = gen::cycle(6);
        let distances = all_pairs(&graph);
        let weights = vec![1.0; 6];
        let mut rng = SmallRng::seed_from_u64(0);
        let centers = wang_cheng_weighted_k_center(&graph, &distances, &weights, 2, &mut rng);
        assert_eq!(centers.len(), 2);
        assert_eq!(coverage_radius(&distances, &centers), 1);
    }

    #[test]
    fn wang_cheng_is_within_twice_the_optimum() {
        let graph = gen::petersen();
        let distances = all_pairs(&graph);
        let weights: Vec<f64> = graph.nodes().map(|v| 1.0 + graph.degree(v) as f64).collect();
        let mut rng = SmallRng::seed_from_u64(3);
        let centers = wang_cheng_weighted_k_center(&graph, &distances, &weights, 2, &mut rng);
        let optimum = brute_force_radius(&distances, 2);
        assert!(coverage_radius(&distances, &centers) <= 2 * optimum);
    }

    #[test]
    fn wang_cheng_pads_with_duplicates() {
        let graph = gen::complete(3);
        let distances = all_pairs(&graph);
        let weights = vec![1.0; 3];
        let mut rng = SmallRng::seed_from_u64(1);
        let centers = wang_cheng_weighted_k_center(&graph, &distances, &weights, 5, &mut rng);
        assert_eq!(centers.len(), 5);
        assert!(centers.iter().all(|&c| c < 3));
    }

    #[test]
    fn pagerank_prefers_the_middle_of_a_path() {
        let graph = gen::path(3);
        let mut weights = FxHashMap::default();
        for (u, v) in graph.edges() {
            weights.insert((u, v), 1.0);
            weights.insert((v, u), 1.0);
        }
        let ranks = pagerank(&graph, &weights).unwrap();
        assert!((ranks.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert!(ranks[1] > ranks[0]);
        assert!((ranks[0] - ranks[2]).abs() < 1e-9);
    }
}
