//! # Chain Store
//!
//! [`ChainStore`] is the mutation side of the external chain: the gate
//! validates and writes segments through it and moves the canonical head
//! with it. [`MemoryStore`] is the in-memory implementation used by
//! [`BlockChain`](crate::BlockChain), tests and the CLI.
//!
//! ## Canonical Index
//!
//! `MemoryStore` keeps a `number -> hash` index for the canonical chain.
//! Moving the head rewrites the index from the new head back to the first
//! block that is already canonical, and drops entries above the new head.

use std::collections::{BTreeMap, HashMap};

use mess_core::{BlockHash, ChainReader, Difficulty, Header, Segment};
use thiserror::Error;

/// Errors owned by the chain store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The segment's base parent is not stored.
    #[error("unknown parent {parent} of block #{number}")]
    UnknownParent {
        /// Number of the first header in the segment.
        number: u64,
        /// The missing parent hash.
        parent: BlockHash,
    },

    /// A block expected to be stored is not.
    #[error("unknown block {hash}")]
    UnknownBlock {
        /// The missing hash.
        hash: BlockHash,
    },

    /// A header declares zero difficulty.
    #[error("block #{number} has zero difficulty")]
    ZeroDifficulty {
        /// Number of the offending header.
        number: u64,
    },

    /// A stored block has no recorded total difficulty.
    #[error("no total difficulty recorded for block #{number} ({hash})")]
    MissingTotalDifficulty {
        /// Block hash.
        hash: BlockHash,
        /// Block number.
        number: u64,
    },

    /// No canonical ancestor could be found for a stored block.
    #[error("no canonical ancestor found for block #{number} ({hash})")]
    NoCommonAncestor {
        /// Block hash.
        hash: BlockHash,
        /// Block number.
        number: u64,
    },
}

/// Mutable chain storage consulted and driven by the insertion gate.
pub trait ChainStore: ChainReader {
    /// Standard, policy-independent validation of a new segment.
    fn validate_segment(&self, segment: &Segment) -> Result<(), StoreError>;

    /// Persist the segment's headers and totals without moving the head.
    /// Headers already stored are left untouched. Returns the tip's total
    /// difficulty.
    fn write_segment(&mut self, segment: &Segment) -> Result<Difficulty, StoreError>;

    /// Make the stored block `hash` the canonical head and rewrite the
    /// canonical index accordingly.
    fn set_canonical_head(&mut self, hash: &BlockHash) -> Result<(), StoreError>;

    /// Canonical block hash at `number`, if any.
    fn canonical_hash(&self, number: u64) -> Option<BlockHash>;

    /// Whether `hash` is stored.
    fn contains(&self, hash: &BlockHash) -> bool {
        self.header_by_hash(hash).is_some()
    }
}

/// In-memory header store with a canonical index.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    headers: HashMap<BlockHash, Header>,
    totals: HashMap<BlockHash, Difficulty>,
    canonical: BTreeMap<u64, BlockHash>,
    head: Header,
}

impl MemoryStore {
    /// A store holding only `genesis`, which is canonical and the head.
    /// Its total difficulty is its own difficulty.
    pub fn new(genesis: Header) -> Self {
        let hash = *genesis.hash();
        let head = genesis.clone();
        let mut canonical = BTreeMap::new();
        canonical.insert(genesis.number(), hash);
        let mut totals = HashMap::new();
        totals.insert(hash, genesis.difficulty().clone());
        let mut headers = HashMap::new();
        headers.insert(hash, genesis);
        Self {
            headers,
            totals,
            canonical,
            head,
        }
    }

    /// Number of stored headers, canonical or not.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Always `false`: genesis is stored at construction.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl ChainReader for MemoryStore {
    fn header_by_hash(&self, hash: &BlockHash) -> Option<Header> {
        self.headers.get(hash).cloned()
    }

    fn total_difficulty_of(&self, hash: &BlockHash, number: u64) -> Option<Difficulty> {
        let header = self.headers.get(hash)?;
        if header.number() != number {
            return None;
        }
        self.totals.get(hash).cloned()
    }

    fn current_head(&self) -> Header {
        self.head.clone()
    }

    fn common_ancestor_of(&self, header: &Header) -> Option<Header> {
        let mut cursor = header.clone();
        loop {
            if self.canonical.get(&cursor.number()) == Some(cursor.hash()) {
                return Some(cursor);
            }
            cursor = self.headers.get(cursor.parent_hash())?.clone();
        }
    }
}

impl ChainStore for MemoryStore {
    fn validate_segment(&self, segment: &Segment) -> Result<(), StoreError> {
        if !self.headers.contains_key(segment.base_parent_hash()) {
            return Err(StoreError::UnknownParent {
                number: segment.first().number(),
                parent: *segment.base_parent_hash(),
            });
        }
        if let Some(zero) = segment.iter().find(|h| h.difficulty().is_zero()) {
            return Err(StoreError::ZeroDifficulty {
                number: zero.number(),
            });
        }
        Ok(())
    }

    fn write_segment(&mut self, segment: &Segment) -> Result<Difficulty, StoreError> {
        let parent = segment.base_parent_hash();
        let mut td = self
            .totals
            .get(parent)
            .cloned()
            .ok_or(StoreError::UnknownParent {
                number: segment.first().number(),
                parent: *parent,
            })?;
        for header in segment {
            td += header.difficulty();
            let hash = *header.hash();
            if !self.headers.contains_key(&hash) {
                self.headers.insert(hash, header.clone());
                self.totals.insert(hash, td.clone());
            }
        }
        Ok(td)
    }

    fn set_canonical_head(&mut self, hash: &BlockHash) -> Result<(), StoreError> {
        let new_head = self
            .headers
            .get(hash)
            .cloned()
            .ok_or(StoreError::UnknownBlock { hash: *hash })?;

        let stale: Vec<u64> = self
            .canonical
            .range(new_head.number().saturating_add(1)..)
            .map(|(n, _)| *n)
            .collect();
        for number in stale {
            self.canonical.remove(&number);
        }

        let mut cursor = new_head.clone();
        loop {
            if self.canonical.get(&cursor.number()) == Some(cursor.hash()) {
                break;
            }
            self.canonical.insert(cursor.number(), *cursor.hash());
            match self.headers.get(cursor.parent_hash()) {
                Some(parent) => cursor = parent.clone(),
                None => break,
            }
        }
        self.head = new_head;
        Ok(())
    }

    fn canonical_hash(&self, number: u64) -> Option<BlockHash> {
        self.canonical.get(&number).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{genesis, SegmentBuilder};

    #[test]
    fn genesis_is_head_and_canonical() {
        let g = genesis();
        let store = MemoryStore::new(g.clone());
        assert_eq!(store.current_head(), g);
        assert_eq!(store.canonical_hash(0), Some(*g.hash()));
        assert_eq!(
            store.total_difficulty_of(g.hash(), 0),
            Some(g.difficulty().clone())
        );
        assert_eq!(store.total_difficulty_of(g.hash(), 1), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn write_accumulates_totals_without_moving_head() {
        let g = genesis();
        let mut store = MemoryStore::new(g.clone());
        let seg = SegmentBuilder::on(&g).build(3).unwrap();
        store.validate_segment(&seg).unwrap();
        let td = store.write_segment(&seg).unwrap();

        let expected = g.difficulty() + &seg.difficulty_sum();
        assert_eq!(td, expected);
        assert_eq!(store.total_difficulty_of(seg.tip().hash(), 3), Some(expected));
        assert_eq!(store.current_head(), g);
        assert_eq!(store.canonical_hash(1), None);
    }

    #[test]
    fn unknown_parent_fails_validation() {
        let g = genesis();
        let store = MemoryStore::new(g.clone());
        let other = SegmentBuilder::on(&g).build(2).unwrap();
        let orphan = Segment::new(other.headers()[1..].to_vec()).unwrap();
        assert!(matches!(
            store.validate_segment(&orphan),
            Err(StoreError::UnknownParent { number: 2, .. })
        ));
    }

    #[test]
    fn reorg_rewrites_canonical_index() {
        let g = genesis();
        let mut store = MemoryStore::new(g.clone());
        let main = SegmentBuilder::on(&g).build(5).unwrap();
        store.write_segment(&main).unwrap();
        store.set_canonical_head(main.tip().hash()).unwrap();
        assert_eq!(store.canonical_hash(5), Some(*main.tip().hash()));

        let fork_point = &main.headers()[1];
        let side = SegmentBuilder::on(fork_point).seed(9).build(2).unwrap();
        store.write_segment(&side).unwrap();
        assert_eq!(
            store.common_ancestor_of(side.tip()).unwrap().hash(),
            fork_point.hash()
        );

        store.set_canonical_head(side.tip().hash()).unwrap();
        assert_eq!(store.current_head(), side.tip().clone());
        assert_eq!(store.canonical_hash(3), Some(*side.headers()[0].hash()));
        assert_eq!(store.canonical_hash(4), Some(*side.tip().hash()));
        assert_eq!(store.canonical_hash(5), None);
        assert_eq!(store.canonical_hash(2), Some(*fork_point.hash()));
        // The old branch stays stored.
        assert!(store.contains(main.tip().hash()));
        assert_eq!(
            store.common_ancestor_of(main.tip()).unwrap().hash(),
            fork_point.hash()
        );
    }

    #[test]
    fn unknown_head_is_refused() {
        let mut store = MemoryStore::new(genesis());
        let missing = BlockHash::from_bytes([7; 32]);
        assert_eq!(
            store.set_canonical_head(&missing),
            Err(StoreError::UnknownBlock { hash: missing })
        );
    }
}
