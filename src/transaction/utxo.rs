use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::model::{Transaction, TxOut};
use super::validation;
use crate::error::Result;

/// Identifies a specific transaction output by its transaction id and index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub tx_out_id: String,
    pub tx_out_index: u32,
}

impl OutPoint {
    pub fn new(tx_out_id: impl Into<String>, tx_out_index: u32) -> Self {
        Self {
            tx_out_id: tx_out_id.into(),
            tx_out_index,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_out_id, self.tx_out_index)
    }
}

/// A materialized, currently spendable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentTxOut {
    pub tx_out_id: String,
    pub tx_out_index: u32,
    pub address: String,
    pub amount: u64,
}

impl UnspentTxOut {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_out_id.clone(), self.tx_out_index)
    }
}

/// Spendable outputs keyed by `(txOutId, txOutIndex)`.
///
/// A set is never edited after it is handed out: applying a block yields a
/// fresh set, so a clone taken at any point is a consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    map: HashMap<OutPoint, TxOut>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOut> {
        self.map.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.map.contains_key(outpoint)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Every entry as an owned record, sorted for stable presentation.
    pub fn unspent_outputs(&self) -> Vec<UnspentTxOut> {
        let mut all: Vec<UnspentTxOut> = self
            .map
            .iter()
            .map(|(op, out)| UnspentTxOut {
                tx_out_id: op.tx_out_id.clone(),
                tx_out_index: op.tx_out_index,
                address: out.address.clone(),
                amount: out.amount,
            })
            .collect();
        all.sort_by(|a, b| {
            a.tx_out_id
                .cmp(&b.tx_out_id)
                .then(a.tx_out_index.cmp(&b.tx_out_index))
        });
        all
    }

    pub fn owned_by(&self, address: &str) -> Vec<UnspentTxOut> {
        self.unspent_outputs()
            .into_iter()
            .filter(|u| u.address == address)
            .collect()
    }

    pub fn balance_of(&self, address: &str) -> u64 {
        self.map
            .values()
            .filter(|out| out.address == address)
            .map(|out| out.amount)
            .fold(0u64, u64::saturating_add)
    }

    /// Validate `transactions` as the body of block `block_index` against this
    /// set and return the resulting set. `self` is left untouched on failure.
    pub fn apply(&self, transactions: &[Transaction], block_index: u64) -> Result<UtxoSet> {
        for tx in transactions {
            validation::validate_transaction_structure(tx)?;
        }
        validation::validate_block_transactions(transactions, self, block_index)?;
        let next = self.update(transactions);
        debug!(
            "UTXO applied for block #{}: {} txs, size {} -> {}",
            block_index,
            transactions.len(),
            self.len(),
            next.len()
        );
        Ok(next)
    }

    /// `self - consumed + created` with no validation.
    pub(crate) fn update(&self, transactions: &[Transaction]) -> UtxoSet {
        let consumed: HashSet<OutPoint> = transactions
            .iter()
            .flat_map(|tx| tx.tx_ins.iter().map(|txin| txin.outpoint()))
            .collect();

        let mut map: HashMap<OutPoint, TxOut> = self
            .map
            .iter()
            .filter(|(op, _)| !consumed.contains(*op))
            .map(|(op, out)| (op.clone(), out.clone()))
            .collect();

        for tx in transactions {
            for (i, out) in tx.tx_outs.iter().enumerate() {
                map.insert(OutPoint::new(tx.id.clone(), i as u32), out.clone());
            }
        }

        UtxoSet { map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{COINBASE_REWARD, Block};
    use crate::error::{LedgerError, TxFault};
    use crate::test_support::{signed_spend, wallet};

    fn genesis_set() -> UtxoSet {
        UtxoSet::new()
            .apply(&Block::genesis().transactions, 0)
            .expect("genesis applies")
    }

    #[test]
    fn genesis_coinbase_is_only_entry() {
        let set = genesis_set();
        assert_eq!(set.len(), 1);
        let genesis_tx = &Block::genesis().transactions[0];
        assert!(set.contains(&OutPoint::new(genesis_tx.id.clone(), 0)));
    }

    #[test]
    fn spend_replaces_consumed_output() {
        let alice = wallet(1);
        let bob = wallet(2);
        let base = UtxoSet::new()
            .apply(&[Transaction::coinbase(&alice.public_key(), 1)], 1)
            .unwrap();
        let coin = base.unspent_outputs().remove(0);

        let spend = signed_spend(&alice, &[coin.clone()], &bob.public_key(), 30);
        let txs = vec![Transaction::coinbase(&alice.public_key(), 2), spend.clone()];
        let next = base.apply(&txs, 2).unwrap();

        assert!(!next.contains(&coin.outpoint()));
        assert_eq!(next.len(), 3);
        assert_eq!(next.balance_of(&bob.public_key()), 30);
        assert_eq!(next.balance_of(&alice.public_key()), 20 + COINBASE_REWARD);
        // the source set is a snapshot and stays as it was
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn rejected_list_leaves_set_untouched() {
        let alice = wallet(1);
        let bob = wallet(2);
        let base = UtxoSet::new()
            .apply(&[Transaction::coinbase(&alice.public_key(), 1)], 1)
            .unwrap();
        let coin = base.unspent_outputs().remove(0);

        let first = signed_spend(&alice, &[coin.clone()], &bob.public_key(), 50);
        let second = signed_spend(&alice, &[coin], &alice.public_key(), 50);
        let txs = vec![Transaction::coinbase(&alice.public_key(), 2), first, second];

        let err = base.apply(&txs, 2).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::TransactionInvalid(TxFault::DuplicateInput(_))
        ));
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn balance_sums_every_output_of_address() {
        let alice = wallet(1);
        let set = UtxoSet::new().update(&[
            Transaction::coinbase(&alice.public_key(), 1),
            Transaction::coinbase(&alice.public_key(), 2),
        ]);
        assert_eq!(set.balance_of(&alice.public_key()), 2 * COINBASE_REWARD);
        assert_eq!(set.owned_by(&alice.public_key()).len(), 2);
        assert_eq!(set.balance_of("04nobody"), 0);
    }
}
