use crate::core::transaction::OutPoint;
use crate::core::utxo::{UtxoEntry, UtxoSet};
use crate::core::Transaction;
use crate::{LedgerError, Result};

/// Transactions accepted but not yet committed into a block.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    pending: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a transfer of `amount` from `from` to `to` and queues it.
    ///
    /// Inputs are picked oldest first among `from`'s unspent outputs that no
    /// pending transaction has already claimed. On failure nothing is queued.
    pub fn add_transaction(
        &mut self,
        utxo_set: &UtxoSet,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<Transaction> {
        if to.trim().is_empty() {
            return Err(LedgerError::InvalidInput("destination address must not be empty".to_string()));
        }
        if amount == 0 {
            return Err(LedgerError::InvalidInput("amount must be greater than zero".to_string()));
        }

        let spendable: Vec<UtxoEntry> = utxo_set
            .unspent_outputs_for(from)
            .into_iter()
            .filter(|entry| !self.is_claimed(&entry.outpoint()))
            .collect();

        let available = spendable
            .iter()
            .fold(0u64, |total, entry| total.saturating_add(entry.amount));
        if available < amount {
            log::debug!("Rejected transfer of {} from {}: only {} available", amount, from, available);
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        let mut selected = Vec::new();
        let mut accumulated = 0u64;
        for entry in spendable {
            accumulated = accumulated.checked_add(entry.amount).ok_or_else(|| {
                LedgerError::AmountOverflow(format!("inputs selected for {} exceed u64::MAX", amount))
            })?;
            selected.push(entry.outpoint());

            if accumulated >= amount {
                break;
            }
        }

        let tx = Transaction::new_transfer(from, to, amount, selected, accumulated);
        log::info!("💰 Queued transaction {} ({} -> {}: {})", tx.id, from, to, amount);

        self.pending.push(tx.clone());
        Ok(tx)
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Whether a pending transaction already spends `outpoint`.
    pub fn is_claimed(&self, outpoint: &OutPoint) -> bool {
        self.pending
            .iter()
            .flat_map(|tx| tx.inputs.iter())
            .any(|input| &input.previous_output == outpoint)
    }

    /// Empties the pool, handing back the pending transactions in order.
    pub fn drain(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }

    /// Queues `tx` without input selection or claim checks.
    #[cfg(test)]
    pub(crate) fn push_unchecked(&mut self, tx: Transaction) {
        self.pending.push(tx);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
