use crate::graph::{Graph, NodeId};

/// One connected component of the match graph, kept as its own densely
/// numbered graph. Components are independent sub-games: a cop can never
/// leave its island, so planning happens per island in local ids.
pub struct Component {
    pub graph: Graph,
    /// local id → match graph id
    pub to_global: Vec<NodeId>,
}

impl Component {
    pub fn n_nodes(&self) -> usize {
        self.graph.n_nodes()
    }

    pub fn to_local(&self, global: NodeId) -> Option<NodeId> {
        self.to_global.binary_search(&global).ok().map(|i| i as NodeId)
    }
}

/// Splits a graph into components plus the node → component index map.
pub fn split_components(graph: &Graph) -> (Vec<Component>, Vec<usize>) {
    let mut membership = vec![0; graph.n_nodes()];
    let components = graph
        .connected_components()
        .into_iter()
        .enumerate()
        .map(|(index, nodes)| {
            for &node in &nodes {
                membership[node as usize] = index;
            }
            let (subgraph, to_global) = graph.subgraph(&nodes);
            Component { graph: subgraph, to_global }
        })
        .collect();

    (components, membership)
}

/// Node set left after iteratively dropping nodes of degree ≤ 1. A robber in
/// the dropped region is doomed anyway, so it contributes nothing to the cop
/// demand of its island. The result can be empty (paths, trees).
pub fn trap_free_node_count_and_mean_degree(graph: &Graph) -> (usize, f64) {
    let mut alive = vec![true; graph.n_nodes()];
    let mut n_alive = graph.n_nodes();

    loop {
        let mut dropped = false;
        for v in graph.nodes() {
            if !alive[v as usize] {
                continue;
            }
            let degree = graph
                .neighbors(v)
                .iter()
                .filter(|&&w| alive[w as usize])
                .count();
            if degree <= 1 {
                alive[v as usize] = false;
                n_alive -= 1;
                dropped = true;
            }
        }
        if !dropped {
            break;
        }
    }

    if n_alive == 0 {
        return (0, 0.0);
    }

    let total_degree: usize = graph
        .nodes()
        .filter(|&v| alive[v as usize])
        .map(|v| graph.neighbors(v).iter().filter(|&&w| alive[w as usize]).count())
        .sum();

    (n_alive, total_degree as f64 / n_alive as f64)
}

/// Per-component share of the cop force, derived from the trap-free core of
/// each island: mean degree while the island is sparse, a tapered square
/// root once it is denser than √n. Degenerate all-zero demands fall back to
/// plain node-count proportions.
pub fn component_cop_distribution(components: &[Component]) -> Vec<f64> {
    let demands: Vec<f64> = components
        .iter()
        .map(|component| {
            let (n_trap_free, mean_degree) = trap_free_node_count_and_mean_degree(&component.graph);
            if n_trap_free == 0 {
                return 0.0;
            }
            let sqrt_nodes = (n_trap_free as f64).sqrt();
            if mean_degree <= sqrt_nodes {
                mean_degree
            } else {
                sqrt_nodes * (1.0 - (mean_degree - sqrt_nodes) / (n_trap_free as f64 - sqrt_nodes))
            }
        })
        .collect();

    let total: f64 = demands.iter().sum();
    if total == 0.0 {
        let n_nodes: usize = components.iter().map(Component::n_nodes).sum();
        assert!(n_nodes > 0, "cop distribution over an empty graph");
        return components.iter().map(|c| c.n_nodes() as f64 / n_nodes as f64).collect();
    }

    demands.iter().map(|demand| demand / total).collect()
}

/// Allocates the cop force to islands. With fewer cops than islands the
/// smallest islands get one each; otherwise every island gets one and the
/// remainder goes out by proportion floors, biggest fractional remainder
/// first.
pub fn allocate_cops(components: &[Component], proportions: &[f64], n_cops: usize) -> Vec<usize> {
    let n_components = components.len();
    let mut allocation = vec![0; n_components];

    if n_cops < n_components {
        let mut by_size: Vec<usize> = (0..n_components).collect();
        by_size.sort_by_key(|&i| (components[i].n_nodes(), i));
        for &index in by_size.iter().take(n_cops) {
            allocation[index] = 1;
        }
        return allocation;
    }

    let remainder = n_cops - n_components;
    let mut fractions: Vec<(usize, f64)> = Vec::with_capacity(n_components);
    for index in 0..n_components {
        let share = remainder as f64 * proportions[index];
        allocation[index] = 1 + share.floor() as usize;
        fractions.push((index, share - share.floor()));
    }

    let mut left_over = n_cops - allocation.iter().sum::<usize>();
    fractions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
    for &(index, _) in &fractions {
        if left_over == 0 {
            break;
        }
        allocation[index] += 1;
        left_over -= 1;
    }

    allocation
}
