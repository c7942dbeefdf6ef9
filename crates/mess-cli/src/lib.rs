//! # mess-cli — MESS Diagnostic Command-Line Interface
//!
//! Exercises the reorg gate against synthetic chains, without a network or
//! a database.
//!
//! ## Subcommands
//!
//! - `curve` — tabulate a penalty curve over elapsed seconds
//! - `simulate` — insert one competing branch (optionally twice) and report
//! - `sweep` — accept/reject/side grid over fork depth and branch speed
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; arbitration lives in `mess-chain` and
//!   `mess-policy`.
//! - Handlers return `anyhow::Result<u8>` (the process exit code).

pub mod config;
pub mod curve;
pub mod simulate;
pub mod sweep;
