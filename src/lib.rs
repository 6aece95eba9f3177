//! Linkchain - An in-memory hash-linked ledger
//!
//! This library implements:
//! - An append-only chain of SHA-256 linked blocks with a genesis block
//! - A UTXO-based transaction model with coinbase rewards
//! - A mempool that queues transfers until the next block commits them
//! - A JSON REST API and a small CLI to run the node

pub mod core;
pub mod crypto;
pub mod cli;
pub mod api;
pub mod error;
pub mod config;

pub use error::{LedgerError, Result};
