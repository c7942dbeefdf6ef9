//! # mess-core — Foundational Chain Types
//!
//! Leaf crate of the MESS workspace. It defines the read-only view of a
//! proof-of-work chain that the artificial-finality gate operates on:
//!
//! 1. **`BlockHash`** — 32-byte SHA-256 header hash with `0x` hex display.
//!
//! 2. **`Difficulty`** — arbitrary-precision unsigned difficulty and total
//!    difficulty. Totals are summed over thousands of blocks and then
//!    cross-multiplied by curve numerators, so no fixed-width integer or
//!    float is used on the decision path.
//!
//! 3. **`Header`** — immutable header record. The hash is computed at
//!    construction and re-verified on deserialization.
//!
//! 4. **`Segment`** — a non-empty, contiguous run of headers. Linkage,
//!    numbering and timestamp order are checked once at construction.
//!
//! 5. **`ChainReader`** — the narrow read interface consumed from the
//!    external chain store.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mess-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public data types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod difficulty;
pub mod error;
pub mod hash;
pub mod header;
pub mod reader;
pub mod segment;

// Re-export primary types for ergonomic imports.
pub use difficulty::Difficulty;
pub use error::InconsistentInput;
pub use hash::{BlockHash, ParseHashError};
pub use header::{Header, HeaderHashMismatch};
pub use reader::ChainReader;
pub use segment::Segment;
