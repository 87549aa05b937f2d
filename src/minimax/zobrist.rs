use rand::rngs::SmallRng;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::graph::NodeId;

/// A move as the search tree sees it: a joint destination per cop, or a
/// single robber destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchMove {
    Cops(Vec<NodeId>),
    Robber(NodeId),
}

/// Pre-sampled Zobrist key families for one graph. `cop_keys[v][k]` keys the
/// (k+1)-th cop standing on `v`, so a state hashes the same under any
/// permutation of its cops while co-located cops still change the key.
struct ZobristKeys {
    cop_keys: Vec<Vec<u64>>,
    robber_keys: Vec<u64>,
    turn_keys: [u64; 2],
}

impl ZobristKeys {
    fn new(n_nodes: usize, n_cops: usize, rng: &mut SmallRng) -> Self {
        Self {
            cop_keys: (0..n_nodes)
                .map(|_| (0..n_cops.max(1)).map(|_| rng.random()).collect())
                .collect(),
            robber_keys: (0..n_nodes).map(|_| rng.random()).collect(),
            turn_keys: [rng.random(), rng.random()],
        }
    }

    /// XOR of the robber key, the turn key, and one cop key per distinct cop
    /// position indexed by its multiplicity. Commutativity of XOR collapses
    /// all cop orderings onto one hash; collisions between genuinely
    /// different states remain possible and are tolerated.
    fn key(&self, cop_positions: &[NodeId], robber_position: NodeId, cop_turn: bool) -> u64 {
        let mut multiplicity: FxHashMap<NodeId, usize> = FxHashMap::default();
        for &cop in cop_positions {
            *multiplicity.entry(cop).or_insert(0) += 1;
        }

        let cop_hash = multiplicity
            .iter()
            .fold(0u64, |hash, (&position, &count)| {
                hash ^ self.cop_keys[position as usize][count - 1]
            });

        cop_hash ^ self.robber_keys[robber_position as usize] ^ self.turn_keys[cop_turn as usize]
    }
}

struct TableEntry {
    depth: u32,
    best_move: SearchMove,
    value: f64,
}

/// Transposition table over game states `(cops, robber, turn)`. Entries
/// remember the remaining depth they were computed at; shallower results
/// never evict deeper ones.
pub struct TranspositionTable {
    keys: ZobristKeys,
    table: FxHashMap<u64, TableEntry>,
}

impl TranspositionTable {
    pub fn new(n_nodes: usize, n_cops: usize, rng: &mut SmallRng) -> Self {
        Self { keys: ZobristKeys::new(n_nodes, n_cops, rng), table: FxHashMap::default() }
    }

    pub fn hash(&self, cop_positions: &[NodeId], robber_position: NodeId, cop_turn: bool) -> u64 {
        self.keys.key(cop_positions, robber_position, cop_turn)
    }

    /// True only when an entry exists that was searched at least `depth`
    /// deep.
    pub fn contains(
        &self,
        cop_positions: &[NodeId],
        robber_position: NodeId,
        cop_turn: bool,
        depth: u32,
    ) -> bool {
        let key = self.hash(cop_positions, robber_position, cop_turn);
        self.table.get(&key).is_some_and(|entry| entry.depth >= depth)
    }

    /// The stored move and value for a state, regardless of the depth it was
    /// computed at.
    pub fn get(
        &self,
        cop_positions: &[NodeId],
        robber_position: NodeId,
        cop_turn: bool,
    ) -> Option<(&SearchMove, f64)> {
        let key = self.hash(cop_positions, robber_position, cop_turn);
        self.table.get(&key).map(|entry| (&entry.best_move, entry.value))
    }

    /// Stores a result unless a deeper one is already present.
    pub fn insert(
        &mut self,
        cop_positions: &[NodeId],
        robber_position: NodeId,
        cop_turn: bool,
        depth: u32,
        best_move: SearchMove,
        value: f64,
    ) {
        let key = self.hash(cop_positions, robber_position, cop_turn);
        match self.table.get_mut(&key) {
            Some(entry) if entry.depth >= depth => {}
            Some(entry) => *entry = TableEntry { depth, best_move, value },
            None => {
                self.table.insert(key, TableEntry { depth, best_move, value });
            }
        }
    }

    #[cfg(test)]
    fn stored_depth(&self, key: u64) -> Option<u32> {
        self.table.get(&key).map(|entry| entry.depth)
    }
}
