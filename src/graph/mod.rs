pub mod gen;
pub mod json;
pub mod search;

/// Dense node identifier. Graphs remap whatever labels their source carries
/// to `0..n` once at construction so every per-node table can be a flat array.
pub type NodeId = u32;

/// Undirected simple graph. Immutable for the duration of a match, so the
/// adjacency lists are sorted once and every traversal is deterministic.
#[derive(Clone, Debug)]
pub struct Graph {
    adjacency: Vec<Vec<NodeId>>,
    n_edges: usize,
}

impl Graph {
    /// Builds a graph from an edge list. Self loops and duplicate edges are
    /// discarded.
    pub fn from_edges(n_nodes: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let mut adjacency = vec![Vec::new(); n_nodes];
        for &(u, v) in edges {
            assert!(
                (u as usize) < n_nodes && (v as usize) < n_nodes,
                "edge ({u}, {v}) references a node outside 0..{n_nodes}"
            );
            if u == v {
                continue;
            }
            adjacency[u as usize].push(v);
            adjacency[v as usize].push(u);
        }

        let mut n_edges = 0;
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
            n_edges += list.len();
        }

        Self { adjacency, n_edges: n_edges / 2 }
    }

    pub fn n_nodes(&self) -> usize {
        self.adjacency.len()
    }

    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        0..self.adjacency.len() as NodeId
    }

    pub fn neighbors(&self, v: NodeId) -> &[NodeId] {
        &self.adjacency[v as usize]
    }

    pub fn degree(&self, v: NodeId) -> usize {
        self.adjacency[v as usize].len()
    }

    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.adjacency[u as usize].binary_search(&v).is_ok()
    }

    /// Iterates every edge once, with the smaller endpoint first.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes().flat_map(move |u| {
            self.neighbors(u).iter().filter(move |&&v| u < v).map(move |&v| (u, v))
        })
    }

    pub fn max_degree_node(&self) -> NodeId {
        assert!(self.n_nodes() > 0, "max degree node of an empty graph");
        self.nodes().max_by_key(|&v| self.degree(v)).unwrap()
    }

    /// Maximal connected subsets, each sorted ascending. Every node lands in
    /// exactly one component.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut seen = vec![false; self.n_nodes()];
        let mut components = Vec::new();

        for start in self.nodes() {
            if seen[start as usize] {
                continue;
            }
            let mut component = vec![start];
            let mut frontier = vec![start];
            seen[start as usize] = true;

            while let Some(node) = frontier.pop() {
                for &neighbor in self.neighbors(node) {
                    if !seen[neighbor as usize] {
                        seen[neighbor as usize] = true;
                        component.push(neighbor);
                        frontier.push(neighbor);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }

    /// Induced subgraph over `nodes`, renumbered densely. The returned vector
    /// maps the new id `i` back to `nodes[i]`.
    pub fn subgraph(&self, nodes: &[NodeId]) -> (Graph, Vec<NodeId>) {
        let mut local = vec![NodeId::MAX; self.n_nodes()];
        for (i, &v) in nodes.iter().enumerate() {
            local[v as usize] = i as NodeId;
        }

        let mut edges = Vec::new();
        for (i, &v) in nodes.iter().enumerate() {
            for &w in self.neighbors(v) {
                let j = local[w as usize];
                if j != NodeId::MAX && (i as NodeId) < j {
                    edges.push((i as NodeId, j));
                }
            }
        }

        (Graph::from_edges(nodes.len(), &edges), nodes.to_vec())
    }
}

/// Flat membership set over dense node ids. The effective game graph is one
/// of these layered over the level graph rather than a rebuilt adjacency.
#[derive(Clone, Debug)]
pub struct NodeSet {
    bits: Vec<bool>,
    len: usize,
}

impl NodeSet {
    pub fn new(n_nodes: usize) -> Self {
        Self { bits: vec![false; n_nodes], len: 0 }
    }

    pub fn insert(&mut self, v: NodeId) -> bool {
        let slot = &mut self.bits[v as usize];
        let fresh = !*slot;
        if fresh {
            *slot = true;
            self.len += 1;
        }
        fresh
    }

    pub fn remove(&mut self, v: NodeId) -> bool {
        let slot = &mut self.bits[v as usize];
        let present = *slot;
        if present {
            *slot = false;
            self.len -= 1;
        }
        present
    }

    pub fn contains(&self, v: NodeId) -> bool {
        self.bits[v as usize]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
