use crate::core::Transaction;
use crate::crypto::hash::Hash256;
use serde::{Deserialize, Serialize};

/// A committed ledger entry. Fields are only set by [`Block::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub data: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prev_hash: String,
    pub height: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(data: String, transactions: Vec<Transaction>, prev_hash: String, height: u64) -> Self {
        let hash = Self::calculate_hash(&data, &transactions, &prev_hash);

        Self {
            data,
            hash,
            prev_hash,
            height,
            transactions,
        }
    }

    /// SHA-256 over `data || prev_hash || tx ids`, rendered as lowercase hex.
    pub fn calculate_hash(data: &str, transactions: &[Transaction], prev_hash: &str) -> String {
        let mut parts: Vec<&[u8]> = vec![data.as_bytes(), prev_hash.as_bytes()];
        parts.extend(transactions.iter().map(|tx| tx.id.as_bytes()));

        Hash256::hash_parts(&parts).to_hex()
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 1 && self.prev_hash.is_empty()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}
