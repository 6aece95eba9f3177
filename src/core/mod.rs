//! Core ledger components

pub mod ledger;
pub mod block;
pub mod mempool;
pub mod transaction;
pub mod utxo;

pub use ledger::{ChainStatus, Ledger, SharedLedger};
pub use block::Block;
pub use mempool::Mempool;
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput};
pub use utxo::{UtxoSet, UtxoEntry};
