use float_ord::FloatOrd;

use crate::graph::{Graph, NodeId};

/// Contracts a connected graph to `⌈n/2⌉` abstract nodes and returns the
/// node → abstract-node mapping, with abstract ids compacted to
/// `0..⌈n/2⌉` in order of first appearance.
///
/// Edges are contracted in non-decreasing order of the geometric mean of
/// their endpoint degrees: an edge between two low-degree vertices joins
/// "characteristic" neighbourhoods, and the geometric mean is robust against
/// one high-degree outlier endpoint. A strict phase only merges pairs where
/// neither endpoint was contracted yet; if that leaves too many abstract
/// nodes, a loose phase absorbs the remaining untouched nodes into adjacent
/// contractions. Contracting edges of a connected graph keeps the induced
/// abstract graph connected.
pub fn abstract_vertex_pooling(graph: &Graph) -> Vec<NodeId> {
    let n = graph.n_nodes();
    if n == 0 {
        return Vec::new();
    }

    let target = n.div_ceil(2);
    let mut union_find = UnionFind::new(n);
    let mut marked = vec![false; n];
    let mut n_abstract = n;

    let mean_degree = |u: NodeId, v: NodeId| {
        FloatOrd(((graph.degree(u) * graph.degree(v)) as f64).sqrt())
    };

    // Strict phase: both endpoints still untouched.
    let mut edges: Vec<(NodeId, NodeId)> = graph.edges().collect();
    edges.sort_by_key(|&(u, v)| (mean_degree(u, v), u, v));
    for &(u, v) in &edges {
        if n_abstract == target {
            break;
        }
        if marked[u as usize] || marked[v as usize] {
            continue;
        }
        union_find.union(u, v);
        marked[u as usize] = true;
        marked[v as usize] = true;
        n_abstract -= 1;
    }

    // Loose phase: absorb untouched nodes into neighbouring contractions.
    // After an exhausted strict phase no two untouched nodes are adjacent,
    // so every remaining candidate edge crosses into a marked pool.
    if n_abstract > target {
        let mut candidates: Vec<(NodeId, NodeId)> = graph
            .nodes()
            .filter(|&u| !marked[u as usize])
            .flat_map(|u| {
                graph.neighbors(u).iter().filter(|&&v| marked[v as usize]).map(move |&v| (u, v))
            })
            .collect();
        candidates.sort_by_key(|&(u, v)| (mean_degree(u, v), u, v));

        for &(u, v) in &candidates {
            if n_abstract == target {
                break;
            }
            if marked[u as usize] == marked[v as usize] {
                continue;
            }
            union_find.union(u, v);
            marked[u as usize] = true;
            marked[v as usize] = true;
            n_abstract -= 1;
        }
    }

    // Compact root representatives to 0..target in first-seen order.
    let mut compact = vec![NodeId::MAX; n];
    let mut next_id = 0;
    let mut mapping = Vec::with_capacity(n);
    for v in 0..n {
        let root = union_find.find(v as NodeId) as usize;
        if compact[root] == NodeId::MAX {
            compact[root] = next_id;
            next_id += 1;
        }
        mapping.push(compact[root]);
    }

    mapping
}

/// Array union-find with union by rank and path halving.
struct UnionFind {
    parent: Vec<NodeId>,
    rank: Vec<u32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n as NodeId).collect(), rank: vec![1; n] }
    }

    fn find(&mut self, mut v: NodeId) -> NodeId {
        while self.parent[v as usize] != v {
            self.parent[v as usize] = self.parent[self.parent[v as usize] as usize];
            v = self.parent[v as usize];
        }
        v
    }

    fn union(&mut self, u: NodeId, v: NodeId) {
        let u = self.find(u);
        let v = self.find(v);
        if u == v {
            return;
        }
        if self.rank[u as usize] > self.rank[v as usize] {
            self.parent[v as usize] = u;
        } else if self.rank[u as usize] < self.rank[v as usize] {
            self.parent[u as usize] = v;
        } else {
            self.parent[v as usize] = u;
            self.rank[u as usize] += 1;
        }
    }
}
