//! # Reference Chain
//!
//! `BlockChain` plays the part of the external chain around the gate. It
//! owns a [`ChainStore`], the policy configuration and an
//! [`InsertionGate`], and serializes insertions.
//!
//! ## Concurrency
//!
//! Insertion holds the store's write lock for the whole call, so at most one
//! insertion runs at a time and readers observe either the state before or
//! after it. The policy configuration lives under its own lock and is
//! snapshotted at the start of each insertion; toggling it mid-insertion
//! only affects later insertions.

use mess_core::{BlockHash, ChainReader, Difficulty, Header, InconsistentInput, Segment};
use mess_policy::{PolicyConfig, PolicyError};
use parking_lot::RwLock;

use crate::gate::{InsertError, InsertOutcome, InsertionGate};
use crate::store::{ChainStore, MemoryStore};

/// A chain store guarded by the antigravity insertion gate.
#[derive(Debug)]
pub struct BlockChain<S: ChainStore = MemoryStore> {
    store: RwLock<S>,
    config: RwLock<PolicyConfig>,
    gate: InsertionGate,
}

impl BlockChain<MemoryStore> {
    /// An in-memory chain holding only `genesis`.
    pub fn new(genesis: Header, config: PolicyConfig) -> Result<Self, PolicyError> {
        Self::with_store(MemoryStore::new(genesis), config, InsertionGate::new())
    }
}

impl<S: ChainStore> BlockChain<S> {
    /// Wrap an existing store.
    pub fn with_store(store: S, config: PolicyConfig, gate: InsertionGate) -> Result<Self, PolicyError> {
        config.validate()?;
        Ok(Self {
            store: RwLock::new(store),
            config: RwLock::new(config),
            gate,
        })
    }

    /// Turn the antigravity policy on or off for subsequent insertions.
    pub fn set_policy_enabled(&self, enabled: bool) {
        self.config.write().enabled = enabled;
        tracing::info!(enabled, "artificial finality policy toggled");
    }

    /// Replace the whole policy configuration for subsequent insertions.
    pub fn set_policy_config(&self, config: PolicyConfig) -> Result<(), PolicyError> {
        config.validate()?;
        tracing::info!(
            enabled = config.enabled,
            curve = %config.curve,
            span_source = %config.span_source,
            "artificial finality policy reconfigured"
        );
        *self.config.write() = config;
        Ok(())
    }

    /// Snapshot of the current policy configuration.
    pub fn policy_config(&self) -> PolicyConfig {
        self.config.read().clone()
    }

    /// Whether the policy flag is set.
    pub fn policy_enabled(&self) -> bool {
        self.config.read().enabled
    }

    /// Insert a segment. Segments whose blocks are all stored already take
    /// the known-block path; anything else takes the fresh path.
    pub fn insert_chain(&self, segment: &Segment) -> Result<InsertOutcome, InsertError> {
        let config = self.policy_config();
        let mut store = self.store.write();
        let known = segment.iter().all(|h| store.contains(h.hash()));
        if known {
            self.gate
                .handle_known_segment_reinsertion(&mut *store, &config, segment)
        } else {
            self.gate.handle_fresh_segment(&mut *store, &config, segment)
        }
    }

    /// Validate raw headers into a segment, then insert it.
    pub fn insert_headers(&self, headers: Vec<Header>) -> Result<InsertOutcome, InsertError> {
        let segment = Segment::new(headers).map_err(|e: InconsistentInput| {
            tracing::error!(error = %e, "malformed segment submitted");
            InsertError::InconsistentInput(e)
        })?;
        self.insert_chain(&segment)
    }

    /// The canonical head.
    pub fn current_head(&self) -> Header {
        self.store.read().current_head()
    }

    /// A stored header, canonical or not.
    pub fn header_by_hash(&self, hash: &BlockHash) -> Option<Header> {
        self.store.read().header_by_hash(hash)
    }

    /// The canonical header at `number`.
    pub fn header_by_number(&self, number: u64) -> Option<Header> {
        let store = self.store.read();
        let hash = store.canonical_hash(number)?;
        store.header_by_hash(&hash)
    }

    /// Total difficulty of a stored block.
    pub fn total_difficulty(&self, hash: &BlockHash) -> Option<Difficulty> {
        let store = self.store.read();
        let header = store.header_by_hash(hash)?;
        store.total_difficulty_of(hash, header.number())
    }

    /// Whether `hash` is on the canonical chain.
    pub fn is_canonical(&self, hash: &BlockHash) -> bool {
        let store = self.store.read();
        store
            .header_by_hash(hash)
            .and_then(|h| store.canonical_hash(h.number()))
            .is_some_and(|canonical| canonical == *hash)
    }

    /// Run `f` against the store under a read lock.
    pub fn with_store_read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.store.read())
    }
}
