use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::utxo::OutPoint;
use crate::blockchain::COINBASE_REWARD;
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    /// Id of the transaction holding the referenced output.
    pub tx_out_id: String,
    pub tx_out_index: u32,
    /// Hex-encoded DER ECDSA signature over the spending transaction's id.
    pub signature: String,
}

impl TxIn {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_out_id.clone(), self.tx_out_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Uncompressed secp256k1 public key, hex.
    pub address: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub tx_ins: Vec<TxIn>,
    pub tx_outs: Vec<TxOut>,
}

impl Transaction {
    /// Build an unsigned transaction; the id is derived from the content.
    pub fn new(tx_ins: Vec<TxIn>, tx_outs: Vec<TxOut>) -> Self {
        let mut tx = Self {
            id: String::new(),
            tx_ins,
            tx_outs,
        };
        tx.id = transaction_id(&tx);
        tx
    }

    /// Reward-minting transaction for the block at `height`.
    pub fn coinbase(address: &str, height: u32) -> Self {
        Self::new(
            vec![TxIn {
                tx_out_id: String::new(),
                // Index doubles as a height marker so coinbase ids differ per block.
                tx_out_index: height,
                signature: String::new(),
            }],
            vec![TxOut {
                address: address.to_string(),
                amount: COINBASE_REWARD,
            }],
        )
    }

    pub fn total_output_amount(&self) -> u128 {
        self.tx_outs.iter().map(|o| o.amount as u128).sum()
    }

    /// Deterministic text form used inside the block hash preimage.
    pub fn canonical(&self) -> String {
        let mut out = self.id.clone();
        for txin in &self.tx_ins {
            out.push_str(&txin.tx_out_id);
            out.push_str(&txin.tx_out_index.to_string());
            out.push_str(&txin.signature);
        }
        for txout in &self.tx_outs {
            out.push_str(&txout.address);
            out.push_str(&txout.amount.to_string());
        }
        out
    }
}

/// Height marker carried by the coinbase of block `block_index`. Heights past
/// `u32::MAX` cannot be expressed in a txIn index.
pub fn coinbase_height(block_index: u64) -> Result<u32> {
    u32::try_from(block_index).map_err(|_| {
        LedgerError::StructuralInvalid(format!(
            "block #{block_index} is beyond the last height a coinbase can mark"
        ))
    })
}

/// SHA-256 over every input's `(txOutId, txOutIndex)` followed by every
/// output's `(address, amount)`. Signatures are not part of the id, so the id
/// is what each input signs.
pub fn transaction_id(tx: &Transaction) -> String {
    let mut hasher = Sha256::new();
    for txin in &tx.tx_ins {
        hasher.update(txin.tx_out_id.as_bytes());
        hasher.update(txin.tx_out_index.to_string().as_bytes());
    }
    for txout in &tx.tx_outs {
        hasher.update(txout.address.as_bytes());
        hasher.update(txout.amount.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}
