use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{GENESIS_ADDRESS, GENESIS_HASH, GENESIS_TIMESTAMP};
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;
use crate::transaction::validation::{is_hash_hex, validate_transaction_structure};

/// A single block in the blockchain holding a list of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub hash: String,
    pub previous_hash: String,
    pub timestamp: i64, // Unix timestamp (UTC)
    pub transactions: Vec<Transaction>,
    /// Required number of leading zero bits in `hash`.
    pub difficulty: u32,
    pub nonce: u64,
}

impl Block {
    /// The fixed first block every valid chain starts with.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            hash: GENESIS_HASH.to_string(),
            previous_hash: String::new(),
            timestamp: GENESIS_TIMESTAMP,
            transactions: vec![Transaction::coinbase(GENESIS_ADDRESS, 0)],
            difficulty: 0,
            nonce: 0,
        }
    }

    pub fn compute_hash(&self) -> String {
        calculate_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.difficulty,
            self.nonce,
        )
    }

    /// Field shapes only: hex digests, transaction structure, non-empty body.
    /// Says nothing about linkage or proof of work.
    pub fn validate_structure(&self) -> Result<()> {
        if !is_hash_hex(&self.hash) {
            return Err(LedgerError::StructuralInvalid(format!(
                "block #{} hash is not a sha256 hex digest",
                self.index
            )));
        }
        if !is_hash_hex(&self.previous_hash) {
            return Err(LedgerError::StructuralInvalid(format!(
                "block #{} previousHash is not a sha256 hex digest",
                self.index
            )));
        }
        if self.transactions.is_empty() {
            return Err(LedgerError::StructuralInvalid(format!(
                "block #{} carries no transactions",
                self.index
            )));
        }
        self.transactions
            .iter()
            .try_for_each(validate_transaction_structure)
    }
}

/// SHA-256 (lowercase hex) over index, previous hash, timestamp, the
/// transactions in canonical form, difficulty and nonce, in that order.
pub fn calculate_hash(
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    transactions: &[Transaction],
    difficulty: u32,
    nonce: u64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(block_prefix(index, previous_hash, timestamp, transactions));
    hasher.update(format!("{difficulty}{nonce}"));
    hex::encode(hasher.finalize())
}

/// Everything in the preimage before difficulty and nonce. The miner hashes
/// this once and varies only the tail.
pub(crate) fn block_prefix(
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    transactions: &[Transaction],
) -> String {
    let mut preimage = format!("{index}{previous_hash}{timestamp}");
    for tx in transactions {
        preimage.push_str(&tx.canonical());
    }
    preimage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::pow::mine;
    use crate::test_support::wallet;

    #[test]
    fn genesis_hash_is_content_hash() {
        let g = Block::genesis();
        assert_eq!(g.hash, g.compute_hash());
        assert_eq!(g, Block::genesis());
    }

    #[test]
    fn hash_is_deterministic_and_field_sensitive() {
        let txs = vec![Transaction::coinbase(&wallet(1).public_key(), 1)];
        let h = calculate_hash(1, GENESIS_HASH, 100, &txs, 0, 0);
        assert_eq!(h, calculate_hash(1, GENESIS_HASH, 100, &txs, 0, 0));
        assert_eq!(h.len(), 64);
        assert_ne!(h, calculate_hash(1, GENESIS_HASH, 100, &txs, 0, 1));
        assert_ne!(h, calculate_hash(1, GENESIS_HASH, 100, &txs, 1, 0));
        assert_ne!(h, calculate_hash(1, GENESIS_HASH, 101, &txs, 0, 0));
    }

    #[test]
    fn invalid_when_mutated() {
        let txs = vec![Transaction::coinbase(&wallet(1).public_key(), 1)];
        let mut b = mine(1, GENESIS_HASH, 100, txs, 2);
        let old_hash = b.hash.clone();

        // tamper with the reward recipient
        b.transactions[0].tx_outs[0].address = wallet(2).public_key();
        assert_ne!(old_hash, b.compute_hash());
    }

    #[test]
    fn structure_checks() {
        let txs = vec![Transaction::coinbase(&wallet(1).public_key(), 1)];
        let b = mine(1, GENESIS_HASH, 100, txs, 0);
        assert!(b.validate_structure().is_ok());

        let mut empty = b.clone();
        empty.transactions.clear();
        assert!(matches!(
            empty.validate_structure(),
            Err(LedgerError::StructuralInvalid(_))
        ));

        let mut bad_prev = b;
        bad_prev.previous_hash = "xyz".into();
        assert!(bad_prev.validate_structure().is_err());
    }
}
