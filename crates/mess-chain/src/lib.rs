//! # mess-chain — Gated Reference Chain
//!
//! Wires the antigravity policy into block insertion:
//!
//! - **Store** (`store.rs`): `ChainStore`, the mutation interface of the
//!   external chain, and `MemoryStore`, an in-memory implementation with a
//!   canonical number index and total-difficulty bookkeeping.
//!
//! - **Gate** (`gate.rs`): `InsertionGate`, whose fresh-segment and
//!   known-segment entry points share one arbitration routine that applies
//!   raw fork choice, the tie-break and then `ReorgAcceptancePolicy`.
//!
//! - **Chain** (`chain.rs`): `BlockChain`, which owns a store, the policy
//!   configuration and a gate, and serializes insertions.
//!
//! - **Generate** (`generate.rs`): deterministic synthetic headers for tests
//!   and the CLI.
//!
//! ## Observability
//!
//! Verdicts are logged through `tracing` (adoption at `info`, rejection at
//! `warn`, side chains at `debug`, invariant violations at `error`) and
//! counted through the `metrics` facade as `mess_insert_verdicts_total`
//! (labels `verdict`, `path`), `mess_policy_rejections_total` and
//! `mess_insert_already_canonical_total` (label `path`). No
//! exporter is installed here.
//!
//! ## Crate Policy
//!
//! - Depends on `mess-core` and `mess-policy` internally.
//! - Locks are `parking_lot`; none is held across calls out of the crate.
//! - No `.unwrap()` outside tests.

pub mod chain;
pub mod gate;
pub mod generate;
pub mod store;

pub use chain::BlockChain;
pub use gate::{InsertError, InsertOutcome, InsertPath, InsertionGate};
pub use generate::{genesis, next_difficulty, SegmentBuilder};
pub use store::{ChainStore, MemoryStore, StoreError};
