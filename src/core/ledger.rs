use crate::config::ChainConfig;
use crate::core::mempool::Mempool;
use crate::core::utxo::{UtxoEntry, UtxoSet};
use crate::core::{Block, Transaction};
use crate::{LedgerError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock, RwLock};

/// Handle shared by every request handler. One lock guards blocks, mempool
/// and UTXO set together.
pub type SharedLedger = Arc<RwLock<Ledger>>;

static INSTANCE: OnceLock<SharedLedger> = OnceLock::new();

#[derive(Debug)]
pub struct Ledger {
    blocks: Vec<Block>,
    mempool: Mempool,
    utxo_set: UtxoSet,
    config: ChainConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub height: u64,
    pub newest_hash: String,
    pub mempool_size: usize,
    pub blocks: Vec<Block>,
}

impl Ledger {
    /// Creates a ledger holding only the genesis block.
    pub fn new(config: ChainConfig) -> Self {
        let mut ledger = Self {
            blocks: Vec::new(),
            mempool: Mempool::new(),
            utxo_set: UtxoSet::new(),
            config,
        };

        let mut genesis_txs = Vec::new();
        if ledger.config.genesis_allocation > 0 {
            genesis_txs.push(Transaction::new_coinbase(
                &ledger.config.wallet_address,
                ledger.config.genesis_allocation,
                1,
            ));
        }

        let genesis_data = ledger.config.genesis_data.clone();
        let genesis = ledger.push_block(genesis_data, genesis_txs);
        log::info!("🌱 Genesis block created: {}", genesis.hash);

        ledger
    }

    /// The process-wide ledger, built from the default chain config by
    /// whichever caller gets here first.
    pub fn instance() -> SharedLedger {
        INSTANCE
            .get_or_init(|| Ledger::new(ChainConfig::default()).into_shared())
            .clone()
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(RwLock::new(self))
    }

    /// Appends a block carrying `data` and every pending transaction.
    ///
    /// The coinbase (when the reward is non-zero) comes first. A pending
    /// transaction whose inputs are no longer unspent is dropped, so the
    /// earliest claim on an output wins.
    pub fn append_block(&mut self, data: impl Into<String>) -> Block {
        let height = self.next_height();
        let mut transactions = Vec::new();

        if self.config.block_reward > 0 {
            transactions.push(Transaction::new_coinbase(
                &self.config.wallet_address,
                self.config.block_reward,
                height,
            ));
        }

        let mut spent = HashSet::new();
        for tx in self.mempool.drain() {
            let fresh = tx.inputs.iter().all(|input| {
                self.utxo_set.is_unspent(&input.previous_output) && !spent.contains(&input.previous_output)
            });

            if fresh {
                spent.extend(tx.inputs.iter().map(|input| input.previous_output.clone()));
                transactions.push(tx);
            } else {
                log::warn!("❌ Dropping transaction {}: inputs already spent", tx.id);
            }
        }

        self.push_block(data.into(), transactions).clone()
    }

    fn push_block(&mut self, data: String, transactions: Vec<Transaction>) -> &Block {
        let prev_hash = self
            .blocks
            .last()
            .map(|block| block.hash.clone())
            .unwrap_or_default();
        let block = Block::new(data, transactions, prev_hash, self.next_height());

        self.utxo_set.apply_block(&block);
        self.blocks.push(block);

        let block = self.last_block();
        log::info!(
            "✅ Block {} added ({} transactions, hash {})",
            block.height,
            block.transaction_count(),
            block.hash
        );
        block
    }

    fn next_height(&self) -> u64 {
        self.blocks.len() as u64 + 1
    }

    pub fn all_blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Block at the 1-based `height`.
    pub fn block_at(&self, height: i64) -> Result<&Block> {
        if height <= 0 {
            return Err(LedgerError::NotFound { height });
        }

        self.blocks
            .get((height - 1) as usize)
            .ok_or(LedgerError::NotFound { height })
    }

    pub fn last_block(&self) -> &Block {
        match self.blocks.last() {
            Some(block) => block,
            None => unreachable!("ledger always holds its genesis block"),
        }
    }

    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn newest_hash(&self) -> &str {
        &self.last_block().hash
    }

    /// Queues a transfer from the node wallet to `to`.
    pub fn add_transaction(&mut self, to: &str, amount: u64) -> Result<Transaction> {
        self.mempool
            .add_transaction(&self.utxo_set, &self.config.wallet_address, to, amount)
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    pub fn unspent_outputs_for(&self, address: &str) -> Vec<UtxoEntry> {
        self.utxo_set.unspent_outputs_for(address)
    }

    pub fn balance_of(&self, address: &str) -> u64 {
        self.utxo_set.balance_for(address)
    }

    pub fn wallet_address(&self) -> &str {
        &self.config.wallet_address
    }

    pub fn status(&self) -> ChainStatus {
        ChainStatus {
            height: self.height(),
            newest_hash: self.newest_hash().to_string(),
            mempool_size: self.mempool.len(),
            blocks: self.blocks.clone(),
        }
    }

    /// Recomputes every hash, link and transaction from scratch. Returns the
    /// violations found, empty for an intact chain.
    pub fn verify(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut replay = UtxoSet::new();

        for (i, block) in self.blocks.iter().enumerate() {
            if block.height != i as u64 + 1 {
                errors.push(format!("block {} stored at position {}", block.height, i + 1));
            }

            if i == 0 {
                if !block.is_genesis() {
                    errors.push("genesis prev_hash should be empty".to_string());
                }
            } else if block.prev_hash != self.blocks[i - 1].hash {
                errors.push(format!("block {} prev_hash mismatch", block.height));
            }

            let recomputed = Block::calculate_hash(&block.data, &block.transactions, &block.prev_hash);
            if recomputed != block.hash {
                errors.push(format!("block {} hash mismatch", block.height));
            }

            for tx in &block.transactions {
                if !tx.is_coinbase() {
                    if !replay.can_apply(tx) {
                        errors.push(format!("transaction {} spends unavailable outputs", tx.id));
                        continue;
                    }

                    let input_total = tx
                        .inputs
                        .iter()
                        .filter_map(|input| replay.get(&input.previous_output))
                        .try_fold(0u64, |total, entry| total.checked_add(entry.amount));
                    let Some(input_total) = input_total else {
                        errors.push(format!("transaction {} input total overflows", tx.id));
                        replay.apply_transaction(tx, block.height);
                        continue;
                    };
                    if input_total != tx.total_output_value() {
                        errors.push(format!(
                            "transaction {} does not conserve value: in {}, out {}",
                            tx.id,
                            input_total,
                            tx.total_output_value()
                        ));
                    }
                }
                replay.apply_transaction(tx, block.height);
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn message_only() -> ChainConfig {
        ChainConfig {
            block_reward: 0,
            ..ChainConfig::default()
        }
    }

    fn funded(allocation: u64) -> ChainConfig {
        ChainConfig {
            wallet_address: "alice".to_string(),
            block_reward: 0,
            genesis_allocation: allocation,
            ..ChainConfig::default()
        }
    }

    #[test]
    fn test_new_ledger_has_genesis() {
        let ledger = Ledger::new(message_only());
        let genesis = ledger.block_at(1).unwrap();

        assert_eq!(ledger.all_blocks().len(), 1);
        assert_eq!(genesis.data, "Genesis");
        assert_eq!(genesis.prev_hash, "");
        assert!(genesis.is_genesis());
        assert_eq!(ledger.newest_hash(), genesis.hash);
    }

    #[test]
    fn test_append_links_blocks() {
        let mut ledger = Ledger::new(message_only());
        ledger.append_block("A");
        ledger.append_block("B");

        let second = ledger.block_at(2).unwrap();
        assert_eq!(second.data, "A");
        assert_eq!(second.prev_hash, ledger.block_at(1).unwrap().hash);

        let third = ledger.block_at(3).unwrap();
        assert_eq!(third.data, "B");
        assert_eq!(third.prev_hash, second.hash);
        assert!(matches!(ledger.block_at(4), Err(LedgerError::NotFound { height: 4 })));
    }

    #[test]
    fn test_append_grows_by_one() {
        let mut ledger = Ledger::new(ChainConfig::default());

        for expected in 2..=6 {
            let before = ledger.all_blocks().len();
            let block = ledger.append_block(format!("block {}", expected));

            assert_eq!(ledger.all_blocks().len(), before + 1);
            assert_eq!(block.height, expected);
            assert_eq!(ledger.height(), expected);
        }
    }

    #[test]
    fn test_every_hash_recomputes() {
        let mut ledger = Ledger::new(ChainConfig::default());
        ledger.append_block("x");
        ledger.add_transaction("bob", 20).unwrap();
        ledger.append_block("y");

        for block in ledger.all_blocks() {
            assert_eq!(block.hash, Block::calculate_hash(&block.data, &block.transactions, &block.prev_hash));
        }
        for pair in ledger.all_blocks().windows(2) {
            assert_eq!(pair[1].prev_hash, pair[0].hash);
        }
        assert!(ledger.verify().is_empty());
    }

    #[test]
    fn test_block_at_rejects_out_of_range() {
        let ledger = Ledger::new(message_only());

        assert!(matches!(ledger.block_at(0), Err(LedgerError::NotFound { .. })));
        assert!(matches!(ledger.block_at(-3), Err(LedgerError::NotFound { .. })));
        assert!(matches!(ledger.block_at(2), Err(LedgerError::NotFound { .. })));
        assert_eq!(ledger.block_at(2).unwrap_err().to_string(), "block not found");
    }

    #[test]
    fn test_block_reward_funds_wallet() {
        let mut ledger = Ledger::new(ChainConfig::default());
        let block = ledger.append_block("");

        assert!(block.transactions[0].is_coinbase());
        assert_eq!(ledger.balance_of(ledger.wallet_address()), 50);
    }

    #[test]
    fn test_transfer_scenario() {
        let mut ledger = Ledger::new(funded(100));
        assert_eq!(ledger.balance_of("alice"), 100);

        ledger.add_transaction("bob", 40).unwrap();
        assert_eq!(ledger.mempool().len(), 1);
        assert_eq!(ledger.balance_of("alice"), 100);

        let block = ledger.append_block("");
        assert_eq!(block.transaction_count(), 1);
        assert!(ledger.mempool().is_empty());
        assert_eq!(ledger.balance_of("alice"), 60);
        assert_eq!(ledger.balance_of("bob"), 40);
    }

    #[test]
    fn test_insufficient_funds_keeps_mempool() {
        let mut ledger = Ledger::new(funded(100));
        ledger.add_transaction("bob", 30).unwrap();

        let err = ledger.add_transaction("bob", 500).unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { required: 500, .. }));
        assert_eq!(ledger.mempool().len(), 1);
    }

    #[test]
    fn test_conflicting_pending_transaction_is_dropped() {
        let mut ledger = Ledger::new(funded(100));
        let genesis_output = ledger.unspent_outputs_for("alice")[0].outpoint();

        let first = ledger.add_transaction("bob", 40).unwrap();
        let conflicting = Transaction::new_transfer("alice", "carol", 100, vec![genesis_output], 100);
        ledger.mempool.push_unchecked(conflicting);
        assert_eq!(ledger.mempool().len(), 2);

        let block = ledger.append_block("");

        assert_eq!(block.transaction_count(), 1);
        assert_eq!(block.transactions[0].id, first.id);
        assert!(ledger.mempool().is_empty());
        assert_eq!(ledger.balance_of("bob"), 40);
        assert_eq!(ledger.balance_of("carol"), 0);
        assert!(ledger.verify().is_empty());
    }

    #[test]
    fn test_huge_balances_do_not_poison_the_lock() {
        let reward = u64::MAX / 2 + 1;
        let shared = Ledger::new(ChainConfig {
            wallet_address: "alice".to_string(),
            block_reward: reward,
            ..ChainConfig::default()
        })
        .into_shared();

        {
            let mut ledger = shared.write().unwrap();
            for _ in 0..3 {
                ledger.append_block("");
            }
            assert_eq!(ledger.balance_of("alice"), u64::MAX);

            ledger.add_transaction("bob", 1).unwrap();
            let err = ledger.add_transaction("bob", u64::MAX).unwrap_err();
            assert!(matches!(err, LedgerError::AmountOverflow(_)));
            assert_eq!(ledger.mempool().len(), 1);
        }

        assert!(!shared.is_poisoned());
        let mut ledger = shared.write().unwrap();
        ledger.append_block("");
        assert_eq!(ledger.balance_of("bob"), 1);
        assert!(ledger.verify().is_empty());
    }

    #[test]
    fn test_committed_transfers_conserve_value() {
        let mut ledger = Ledger::new(funded(100));
        ledger.add_transaction("bob", 25).unwrap();
        ledger.append_block("");
        ledger.add_transaction("carol", 35).unwrap();
        ledger.append_block("");

        for block in ledger.all_blocks() {
            for tx in block.transactions.iter().filter(|tx| !tx.is_coinbase()) {
                let inputs: u64 = tx
                    .inputs
                    .iter()
                    .map(|input| {
                        ledger
                            .all_blocks()
                            .iter()
                            .flat_map(|b| b.transactions.iter())
                            .find(|candidate| candidate.id == input.previous_output.tx_id)
                            .map(|source| source.outputs[input.previous_output.index as usize].amount)
                            .unwrap()
                    })
                    .sum();
                assert_eq!(inputs, tx.total_output_value());
            }
        }

        assert_eq!(ledger.utxo_set().total_value(), 100);
        assert_eq!(ledger.balance_of("alice"), 40);
        assert_eq!(ledger.balance_of("bob"), 25);
        assert_eq!(ledger.balance_of("carol"), 35);
    }

    #[test]
    fn test_balance_matches_unspent_outputs() {
        let mut ledger = Ledger::new(ChainConfig::default());
        ledger.append_block("");
        ledger.append_block("");
        ledger.add_transaction("bob", 70).unwrap();
        ledger.append_block("");

        for address in [ledger.wallet_address().to_string(), "bob".to_string()] {
            let summed: u64 = ledger.unspent_outputs_for(&address).iter().map(|e| e.amount).sum();
            assert_eq!(summed, ledger.balance_of(&address));
        }
    }

    #[test]
    fn test_verify_detects_tampering() {
        let mut ledger = Ledger::new(message_only());
        ledger.append_block("A");
        ledger.append_block("B");
        ledger.blocks[1].data = "tampered".to_string();

        let errors = ledger.verify();

        assert!(errors.iter().any(|e| e.contains("block 2 hash mismatch")));
    }

    #[test]
    fn test_status_reports_chain() {
        let mut ledger = Ledger::new(funded(10));
        ledger.add_transaction("bob", 5).unwrap();

        let status = ledger.status();

        assert_eq!(status.height, 1);
        assert_eq!(status.mempool_size, 1);
        assert_eq!(status.newest_hash, ledger.block_at(1).unwrap().hash);
        assert_eq!(status.blocks.len(), 1);
    }

    #[test]
    fn test_instance_initializes_once() {
        let handles: Vec<_> = (0..16).map(|_| thread::spawn(Ledger::instance)).collect();
        let instances: Vec<SharedLedger> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for instance in &instances {
            assert!(Arc::ptr_eq(instance, &instances[0]));
        }

        let ledger = instances[0].read().unwrap();
        let genesis_count = ledger.all_blocks().iter().filter(|b| b.is_genesis()).count();
        assert_eq!(genesis_count, 1);
        assert_eq!(ledger.block_at(1).unwrap().data, "Genesis");
    }
}
