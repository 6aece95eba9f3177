use crate::crypto::hash::{Hash256, Hashable};
use serde::{Deserialize, Serialize};

/// Owner recorded on the single input of a coinbase transaction.
pub const COINBASE_OWNER: &str = "COINBASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub timestamp: i64,
    pub lock_height: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    pub previous_output: OutPoint,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub owner: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub tx_id: String,
    pub index: u32,
}

impl Transaction {
    fn with_parts(inputs: Vec<TxInput>, outputs: Vec<TxOutput>, lock_height: u64) -> Self {
        let mut tx = Self {
            id: String::new(),
            timestamp: chrono::Utc::now().timestamp(),
            lock_height,
            inputs,
            outputs,
        };
        tx.id = tx.hash().to_hex();
        tx
    }

    /// Mints `amount` for `address` in the block at `height`.
    pub fn new_coinbase(address: &str, amount: u64, height: u64) -> Self {
        let input = TxInput {
            previous_output: OutPoint::null(),
            owner: COINBASE_OWNER.to_string(),
        };
        let output = TxOutput {
            owner: address.to_string(),
            amount,
        };

        Self::with_parts(vec![input], vec![output], height)
    }

    /// Spends `inputs` (all owned by `from`, worth `input_total` together),
    /// paying `amount` to `to` and returning any change to `from`.
    pub fn new_transfer(
        from: &str,
        to: &str,
        amount: u64,
        inputs: Vec<OutPoint>,
        input_total: u64,
    ) -> Self {
        let inputs = inputs
            .into_iter()
            .map(|previous_output| TxInput {
                previous_output,
                owner: from.to_string(),
            })
            .collect();

        let mut outputs = vec![TxOutput {
            owner: to.to_string(),
            amount,
        }];

        let change = input_total.saturating_sub(amount);
        if change > 0 {
            outputs.push(TxOutput {
                owner: from.to_string(),
                amount: change,
            });
        }

        Self::with_parts(inputs, outputs, 0)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |total, output| total.saturating_add(output.amount))
    }

    /// Outpoint of this transaction's output at `index`.
    pub fn outpoint(&self, index: u32) -> OutPoint {
        OutPoint::new(self.id.clone(), index)
    }
}

impl Hashable for Transaction {
    fn hash(&self) -> Hash256 {
        let mut data = Vec::new();

        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data.extend_from_slice(&self.lock_height.to_le_bytes());

        data.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            data.extend_from_slice(&(input.previous_output.tx_id.len() as u32).to_le_bytes());
            data.extend_from_slice(input.previous_output.tx_id.as_bytes());
            data.extend_from_slice(&input.previous_output.index.to_le_bytes());
            data.extend_from_slice(&(input.owner.len() as u32).to_le_bytes());
            data.extend_from_slice(input.owner.as_bytes());
        }

        data.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            data.extend_from_slice(&(output.owner.len() as u32).to_le_bytes());
            data.extend_from_slice(output.owner.as_bytes());
            data.extend_from_slice(&output.amount.to_le_bytes());
        }

        Hash256::hash(&data)
    }
}

impl OutPoint {
    pub fn new(tx_id: String, index: u32) -> Self {
        Self { tx_id, index }
    }

    pub fn null() -> Self {
        Self {
            tx_id: String::new(),
            index: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.tx_id.is_empty() && self.index == u32::MAX
    }
}
