use log::debug;

use crate::abstraction::pooling::abstract_vertex_pooling;
use crate::abstraction::store::{EdgeRankStore, ShortestPathLengthStore};
use crate::graph::{Graph, NodeId};
use crate::util::deadline::Deadline;

/// Contraction stops once a level has at most this many nodes.
pub const ABSTRACTION_SIZE_THRESHOLD: usize = 5;

/// One level of the hierarchy: the level graph, the mapping glue to its
/// neighbours, and the lazily populated per-level stores.
pub struct GraphAbstraction {
    pub graph: Graph,
    /// previous (finer) level node → node of this level
    vertex_mapping: Vec<NodeId>,
    /// node of this level → its previous-level pre-image, nonempty
    inverse_vertex_mapping: Vec<Vec<NodeId>>,
    /// literal graph node → node of this level, composed across levels
    literal_vertex_mapping: Vec<NodeId>,
    /// node of this level → its literal pre-image
    inverse_literal_mapping: Vec<Vec<NodeId>>,
    pub distances: ShortestPathLengthStore,
    pub ranks: EdgeRankStore,
}

impl GraphAbstraction {
    /// Level 0: the literal graph under identity mappings.
    fn identity(graph: &Graph) -> Self {
        let n = graph.n_nodes();
        let identity: Vec<NodeId> = (0..n as NodeId).collect();
        Self {
            graph: graph.clone(),
            vertex_mapping: identity.clone(),
            inverse_vertex_mapping: identity.iter().map(|&v| vec![v]).collect(),
            literal_vertex_mapping: identity.clone(),
            inverse_literal_mapping: identity.iter().map(|&v| vec![v]).collect(),
            distances: ShortestPathLengthStore::new(),
            ranks: EdgeRankStore::new(),
        }
    }

    /// The pooled contraction of `previous`.
    fn contract(previous: &GraphAbstraction) -> Self {
        let vertex_mapping = abstract_vertex_pooling(&previous.graph);
        let n_abstract =
            vertex_mapping.iter().map(|&a| a as usize).max().map_or(0, |max| max + 1);

        let mut inverse_vertex_mapping = vec![Vec::new(); n_abstract];
        for (node, &abstract_node) in vertex_mapping.iter().enumerate() {
            inverse_vertex_mapping[abstract_node as usize].push(node as NodeId);
        }

        let literal_vertex_mapping: Vec<NodeId> = previous
            .literal_vertex_mapping
            .iter()
            .map(|&prior| vertex_mapping[prior as usize])
            .collect();
        let mut inverse_literal_mapping = vec![Vec::new(); n_abstract];
        for (literal, &abstract_node) in literal_vertex_mapping.iter().enumerate() {
            inverse_literal_mapping[abstract_node as usize].push(literal as NodeId);
        }

        let edges: Vec<_> = previous
            .graph
            .edges()
            .map(|(u, v)| (vertex_mapping[u as usize], vertex_mapping[v as usize]))
            .filter(|(a, b)| a != b)
            .collect();

        Self {
            graph: Graph::from_edges(n_abstract, &edges),
            vertex_mapping,
            inverse_vertex_mapping,
            literal_vertex_mapping,
            inverse_literal_mapping,
            distances: ShortestPathLengthStore::new(),
            ranks: EdgeRankStore::new(),
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.graph.n_nodes()
    }

    /// Image of a literal node on this level.
    pub fn abstract_node(&self, literal: NodeId) -> NodeId {
        self.literal_vertex_mapping[literal as usize]
    }

    pub fn abstract_nodes(&self, literal: &[NodeId]) -> Vec<NodeId> {
        literal.iter().map(|&v| self.abstract_node(v)).collect()
    }

    /// Literal pre-image of one of this level's nodes. Never empty.
    pub fn invert_node(&self, node: NodeId) -> &[NodeId] {
        &self.inverse_literal_mapping[node as usize]
    }

    /// Previous-level pre-image of one of this level's nodes.
    pub fn invert_to_previous(&self, node: NodeId) -> &[NodeId] {
        &self.inverse_vertex_mapping[node as usize]
    }

    pub fn invert_nodes_to_previous(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        nodes.iter().flat_map(|&v| self.invert_to_previous(v).iter().copied()).collect()
    }

    #[cfg(test)]
    pub fn vertex_mapping(&self) -> &[NodeId] {
        &self.vertex_mapping
    }
}

/// The full chain of contractions of one connected graph, level 0 being the
/// literal graph itself. Levels are owned here and addressed by index;
/// index 0 is the finest, the last index the coarsest.
pub struct AbstractionHierarchy {
    levels: Vec<GraphAbstraction>,
}

impl AbstractionHierarchy {
    pub fn new(graph: &Graph) -> Self {
        let mut levels = vec![GraphAbstraction::identity(graph)];
        while levels.last().unwrap().n_nodes() > ABSTRACTION_SIZE_THRESHOLD {
            levels.push(GraphAbstraction::contract(levels.last().unwrap()));
        }
        debug!(
            "abstraction hierarchy over {} nodes: {} levels, sizes {:?}",
            graph.n_nodes(),
            levels.len(),
            levels.iter().map(GraphAbstraction::n_nodes).collect::<Vec<_>>()
        );
        Self { levels }
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, index: usize) -> &GraphAbstraction {
        &self.levels[index]
    }

    pub fn coarsest(&self) -> usize {
        self.levels.len() - 1
    }

    /// Populates distance stores coarsest first: higher levels are cheaper
    /// and more useful when time is short. Stops at the first level whose
    /// pass missed its deadline.
    pub fn populate_shortest_path_lengths(&mut self, deadline: Deadline) {
        for index in (0..self.levels.len()).rev() {
            let GraphAbstraction { graph, distances, .. } = &mut self.levels[index];
            if !distances.populate(graph, deadline) {
                debug!("distance store population ran out of time at level {index}");
                break;
            }
        }
    }

    pub fn populate_edge_ranks(&mut self, deadline: Deadline) {
        for index in (0..self.levels.len()).rev() {
            let GraphAbstraction { graph, ranks, .. } = &mut self.levels[index];
            if !ranks.populate(graph, deadline) {
                debug!("edge rank population ran out of time at level {index}");
                break;
            }
        }
    }

    /// Coarsest level matching the predicate.
    pub fn highest_fitting(
        &self,
        matches: impl Fn(&GraphAbstraction) -> bool,
    ) -> Option<usize> {
        (0..self.levels.len()).rev().find(|&i| matches(&self.levels[i]))
    }

    /// Finest level matching the predicate.
    pub fn lowest_fitting(&self, matches: impl Fn(&GraphAbstraction) -> bool) -> Option<usize> {
        (0..self.levels.len()).find(|&i| matches(&self.levels[i]))
    }

    /// Coarsest level on which no cop's image coincides with the robber's
    /// image, i.e. the level still worth searching. None when the robber is
    /// abstractly caught everywhere (including literally, at level 0).
    pub fn highest_undecided(&self, cop_positions: &[NodeId], robber_position: NodeId) -> Option<usize> {
        self.highest_fitting(|level| {
            let abstract_robber = level.abstract_node(robber_position);
            cop_positions.iter().all(|&cop| level.abstract_node(cop) != abstract_robber)
        })
    }

    /// Finest level whose distance and rank stores are both complete.
    pub fn lowest_informed(&self) -> Option<usize> {
        self.lowest_fitting(|level| level.distances.is_populated() && level.ranks.is_populated())
    }
}
