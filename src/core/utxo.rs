use crate::core::{Block, Transaction};
use crate::core::transaction::OutPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub tx_id: String,
    pub index: u32,
    pub owner: String,
    pub amount: u64,
    pub height: u64,
    pub is_coinbase: bool,
}

impl UtxoEntry {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_id.clone(), self.index)
    }
}

/// Unspent outputs of every committed block, keyed by outpoint.
///
/// Only committed transactions ever reach the index; pending mempool
/// spends are invisible here until their block is appended.
#[derive(Debug, Clone, Default)]
pub struct UtxoSet {
    entries: HashMap<OutPoint, UtxoEntry>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the set from scratch by replaying `blocks` in chain order.
    pub fn rebuild(blocks: &[Block]) -> Self {
        let mut utxo_set = Self::new();
        for block in blocks {
            utxo_set.apply_block(block);
        }
        utxo_set
    }

    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.apply_transaction(tx, block.height);
        }
    }

    pub fn apply_transaction(&mut self, tx: &Transaction, height: u64) {
        if !tx.is_coinbase() {
            for input in &tx.inputs {
                if self.entries.remove(&input.previous_output).is_none() {
                    log::warn!(
                        "Transaction {} spends unknown output {}:{}",
                        tx.id,
                        input.previous_output.tx_id,
                        input.previous_output.index
                    );
                }
            }
        }

        for (index, output) in tx.outputs.iter().enumerate() {
            let entry = UtxoEntry {
                tx_id: tx.id.clone(),
                index: index as u32,
                owner: output.owner.clone(),
                amount: output.amount,
                height,
                is_coinbase: tx.is_coinbase(),
            };
            self.entries.insert(entry.outpoint(), entry);
        }
    }

    pub fn is_unspent(&self, outpoint: &OutPoint) -> bool {
        self.entries.contains_key(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&UtxoEntry> {
        self.entries.get(outpoint)
    }

    /// Whether every input of `tx` still refers to an unspent output.
    pub fn can_apply(&self, tx: &Transaction) -> bool {
        tx.is_coinbase() || tx.inputs.iter().all(|input| self.is_unspent(&input.previous_output))
    }

    /// Unspent outputs owned by `address`, oldest first (height, then
    /// transaction id, then output index).
    pub fn unspent_outputs_for(&self, address: &str) -> Vec<UtxoEntry> {
        let mut utxos: Vec<UtxoEntry> = self
            .entries
            .values()
            .filter(|entry| entry.owner == address)
            .cloned()
            .collect();

        utxos.sort_by(|a, b| {
            (a.height, &a.tx_id, a.index).cmp(&(b.height, &b.tx_id, b.index))
        });
        utxos
    }

    /// Sum of `address`'s unspent amounts, saturating at `u64::MAX`.
    pub fn balance_for(&self, address: &str) -> u64 {
        self.entries
            .values()
            .filter(|entry| entry.owner == address)
            .fold(0u64, |total, entry| total.saturating_add(entry.amount))
    }

    /// Sum of every unspent amount, saturating at `u64::MAX`.
    pub fn total_value(&self) -> u64 {
        self.entries
            .values()
            .fold(0u64, |total, entry| total.saturating_add(entry.amount))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
