use log::{debug, info};
use std::collections::HashSet;

use super::model::Transaction;
use super::utxo::{OutPoint, UtxoSet};
use super::validation::{validate_transaction, validate_transaction_structure};
use crate::error::{Result, TxFault};

/// Validated transactions waiting for a block, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    txs: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Outputs already claimed by some pooled transaction.
    pub fn reserved_outpoints(&self) -> HashSet<OutPoint> {
        self.txs
            .iter()
            .flat_map(|tx| tx.tx_ins.iter().map(|txin| txin.outpoint()))
            .collect()
    }

    /// Admit `tx` if it is well-formed, valid against `utxo` and spends
    /// nothing another pooled transaction already spends.
    pub fn add(&mut self, tx: Transaction, utxo: &UtxoSet) -> Result<()> {
        validate_transaction_structure(&tx)?;
        if self.txs.iter().any(|pooled| pooled.id == tx.id) {
            return Err(TxFault::AlreadyPooled(tx.id).into());
        }
        validate_transaction(&tx, utxo)?;

        let reserved = self.reserved_outpoints();
        if let Some(txin) = tx.tx_ins.iter().find(|i| reserved.contains(&i.outpoint())) {
            return Err(TxFault::PoolConflict(txin.outpoint()).into());
        }

        info!("POOL - added tx {} (size {})", tx.id, self.txs.len() + 1);
        self.txs.push(tx);
        Ok(())
    }

    /// Drop every transaction that spends an output no longer in `utxo`.
    pub fn reconcile(&mut self, utxo: &UtxoSet) {
        let before = self.txs.len();
        self.txs
            .retain(|tx| tx.tx_ins.iter().all(|txin| utxo.contains(&txin.outpoint())));
        let removed = before - self.txs.len();
        if removed > 0 {
            debug!("POOL - reconciled: removed {removed}, {} left", self.txs.len());
        }
    }

    /// Independent copy of the pooled transactions.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.txs.clone()
    }
}
