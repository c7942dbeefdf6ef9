//! # Header — Immutable Block Header
//!
//! The gate only ever reads headers. A `Header` is built once, its hash is
//! derived from the other fields at construction, and no setter exists.
//!
//! ## Hash Preimage
//!
//! ```text
//! number (u64 BE) || timestamp (u64 BE) || parent_hash (32) || nonce (u64 BE)
//!   || len(difficulty) (u32 BE) || difficulty (BE bytes)
//! ```
//!
//! Deserialization recomputes the hash and rejects records whose stored
//! hash disagrees with their contents.

use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;
use crate::hash::BlockHash;

/// An immutable, self-hashed block header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "HeaderFields")]
pub struct Header {
    number: u64,
    timestamp: u64,
    difficulty: Difficulty,
    parent_hash: BlockHash,
    nonce: u64,
    hash: BlockHash,
}

impl Header {
    /// Build a header and compute its hash.
    pub fn new(
        number: u64,
        timestamp: u64,
        difficulty: Difficulty,
        parent_hash: BlockHash,
        nonce: u64,
    ) -> Self {
        let hash = compute_hash(number, timestamp, &difficulty, &parent_hash, nonce);
        Self {
            number,
            timestamp,
            difficulty,
            parent_hash,
            nonce,
            hash,
        }
    }

    /// Block height.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Block timestamp in seconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// This block's own difficulty.
    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    /// Hash of the parent header.
    pub fn parent_hash(&self) -> &BlockHash {
        &self.parent_hash
    }

    /// Proof-of-work nonce. Opaque to the gate; it only feeds the hash.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// This header's hash.
    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    /// Whether `self` is the direct parent of `child`.
    pub fn is_parent_of(&self, child: &Header) -> bool {
        child.parent_hash == self.hash && child.number == self.number.wrapping_add(1)
    }
}

fn compute_hash(
    number: u64,
    timestamp: u64,
    difficulty: &Difficulty,
    parent_hash: &BlockHash,
    nonce: u64,
) -> BlockHash {
    let diff_bytes = difficulty.as_biguint().to_bytes_be();
    let mut preimage = Vec::with_capacity(8 + 8 + 32 + 8 + 4 + diff_bytes.len());
    preimage.extend_from_slice(&number.to_be_bytes());
    preimage.extend_from_slice(&timestamp.to_be_bytes());
    preimage.extend_from_slice(parent_hash.as_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    preimage.extend_from_slice(&(diff_bytes.len() as u32).to_be_bytes());
    preimage.extend_from_slice(&diff_bytes);
    BlockHash::digest(&preimage)
}

/// Wire form of a header before hash verification.
#[derive(Deserialize)]
struct HeaderFields {
    number: u64,
    timestamp: u64,
    difficulty: Difficulty,
    parent_hash: BlockHash,
    nonce: u64,
    hash: BlockHash,
}

/// A deserialized header whose stored hash does not match its fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("header #{number} hash mismatch: stored {stored}, computed {computed}")]
pub struct HeaderHashMismatch {
    /// Header number.
    pub number: u64,
    /// Hash carried by the record.
    pub stored: BlockHash,
    /// Hash recomputed from the fields.
    pub computed: BlockHash,
}

impl TryFrom<HeaderFields> for Header {
    type Error = HeaderHashMismatch;

    fn try_from(f: HeaderFields) -> Result<Self, Self::Error> {
        let header = Header::new(f.number, f.timestamp, f.difficulty, f.parent_hash, f.nonce);
        if header.hash != f.hash {
            return Err(HeaderHashMismatch {
                number: f.number,
                stored: f.hash,
                computed: header.hash,
            });
        }
        Ok(header)
    }
}
