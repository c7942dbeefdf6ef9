//! # Chain Read Interface
//!
//! The reorg gate never owns chain data. Everything it needs is read through
//! [`ChainReader`], implemented by the external chain store.

use crate::difficulty::Difficulty;
use crate::hash::BlockHash;
use crate::header::Header;

/// Read-only access to a chain store.
///
/// Implementations must be internally consistent for the duration of one
/// insertion: the head, the canonical index and stored totals may not
/// change between calls made by a single gate decision.
pub trait ChainReader {
    /// Look up a stored header, canonical or not.
    fn header_by_hash(&self, hash: &BlockHash) -> Option<Header>;

    /// Total difficulty from genesis through the given block, inclusive.
    fn total_difficulty_of(&self, hash: &BlockHash, number: u64) -> Option<Difficulty>;

    /// The current canonical head.
    fn current_head(&self) -> Header;

    /// The most recent canonical header that is an ancestor of (or equal to)
    /// `header`. `None` when the walk back reaches a block that is not stored.
    fn common_ancestor_of(&self, header: &Header) -> Option<Header>;
}
