//! The node: one lock around the ledger state, mining outside of it, and the
//! operations the HTTP layer and peers call into.

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::blockchain::pow::mine_cancellable;
use crate::blockchain::{Block, Blockchain};
use crate::error::{LedgerError, Result};
use crate::transaction::{Transaction, UnspentTxOut, UtxoSet, coinbase_height};
use crate::wallet::Wallet;

/// What happened to a block announced by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockOutcome {
    /// Linked onto our tip and was accepted.
    Appended,
    /// Not ahead of our tip.
    Ignored,
    /// Ahead of us but does not link to our tip; the sender's full chain is
    /// needed to decide.
    NeedChain,
}

/// Consistent read-only view taken under the lock.
#[derive(Debug, Clone, Serialize)]
pub struct ChainStats {
    pub height: usize,
    pub difficulty: u32,
    pub accumulated_difficulty: String,
    pub last_interval_secs: Option<i64>,
    pub pool_size: usize,
    pub utxo_size: usize,
}

pub struct Node {
    state: Mutex<Blockchain>,
    /// Mirrors `Blockchain::version` so running searches can notice a new tip
    /// without taking the lock.
    tip_version: AtomicU64,
    wallet: Wallet,
}

impl Node {
    pub fn new(wallet: Wallet) -> Self {
        Self {
            state: Mutex::new(Blockchain::new()),
            tip_version: AtomicU64::new(0),
            wallet,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Blockchain> {
        // state is only replaced wholesale after validation, so a panic
        // elsewhere cannot leave it half-written
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` under the ledger lock and publish the resulting version.
    fn mutate<T>(&self, f: impl FnOnce(&mut Blockchain) -> Result<T>) -> Result<T> {
        let mut bc = self.lock();
        let out = f(&mut bc);
        self.tip_version.store(bc.version(), Ordering::SeqCst);
        out
    }

    pub fn address(&self) -> String {
        self.wallet.public_key()
    }

    /* -------------------- read views -------------------- */

    pub fn current_chain(&self) -> Vec<Block> {
        self.lock().chain().to_vec()
    }

    pub fn block(&self, hash: &str) -> Option<Block> {
        self.lock().block_by_hash(hash).cloned()
    }

    pub fn pool_snapshot(&self) -> Vec<Transaction> {
        self.lock().pool().snapshot()
    }

    pub fn utxo_snapshot(&self) -> Arc<UtxoSet> {
        self.lock().utxo()
    }

    pub fn balance_of(&self, address: &str) -> u64 {
        self.utxo_snapshot().balance_of(address)
    }

    pub fn my_unspent_outputs(&self) -> Vec<UnspentTxOut> {
        self.utxo_snapshot().owned_by(&self.address())
    }

    pub fn stats(&self) -> ChainStats {
        let bc = self.lock();
        let chain = bc.chain();
        let last_interval_secs = match chain {
            [.., older, newer] => Some(newer.timestamp - older.timestamp),
            _ => None,
        };
        ChainStats {
            height: chain.len(),
            difficulty: bc.difficulty(),
            // u128 does not survive JSON number precision
            accumulated_difficulty: bc.accumulated_difficulty().to_string(),
            last_interval_secs,
            pool_size: bc.pool().len(),
            utxo_size: bc.utxo().len(),
        }
    }

    /* -------------------- mining -------------------- */

    /// Mine a block carrying the coinbase followed by `extra`, then accept it.
    pub fn mine_next(&self, extra: Vec<Transaction>) -> Result<Block> {
        self.mine_on_tip(|_| Ok(extra))
    }

    /// Mine whatever is pooled at the tip the search starts from.
    pub fn mine_pool(&self) -> Result<Block> {
        self.mine_on_tip(|bc| Ok(bc.pool().snapshot()))
    }

    /// Build a payment from this node's wallet and mine it straight away,
    /// bypassing the pool.
    pub fn mine_transaction(&self, receiver: &str, amount: u64) -> Result<Block> {
        self.mine_on_tip(|bc| {
            let tx = self
                .wallet
                .create_transaction(receiver, amount, &bc.utxo(), bc.pool())?;
            Ok(vec![tx])
        })
    }

    /// Mine `transactions` exactly as given (the caller supplies the coinbase).
    pub fn mine_raw(&self, transactions: Vec<Transaction>) -> Result<Block> {
        self.mine_search(|_| Ok(transactions))
    }

    /// Like `mine_search`, with this node's coinbase placed in front of
    /// whatever `extra` picks from the ledger.
    fn mine_on_tip(
        &self,
        extra: impl FnOnce(&Blockchain) -> Result<Vec<Transaction>>,
    ) -> Result<Block> {
        let miner = self.address();
        self.mine_search(move |bc| {
            let height = coinbase_height(bc.last_block().index + 1)?;
            let mut txs = vec![Transaction::coinbase(&miner, height)];
            txs.extend(extra(bc)?);
            Ok(txs)
        })
    }

    /// The tip and the block body are read under one lock, the nonce search
    /// runs without it, and the lock is taken again only to accept the
    /// result. If the tip moves meanwhile the search stops early with
    /// `StaleTip`.
    fn mine_search(
        &self,
        body: impl FnOnce(&Blockchain) -> Result<Vec<Transaction>>,
    ) -> Result<Block> {
        let (tip, difficulty, version, transactions) = {
            let bc = self.lock();
            let transactions = body(&*bc)?;
            (bc.last_block().clone(), bc.difficulty(), bc.version(), transactions)
        };
        let index = tip.index + 1;
        debug!("MINER - searching #{index} at difficulty {difficulty} on v{version}");

        let block = mine_cancellable(
            index,
            &tip.hash,
            Utc::now().timestamp(),
            transactions,
            difficulty,
            || self.tip_version.load(Ordering::SeqCst) != version,
        )
        .ok_or(LedgerError::StaleTip)?;

        self.mutate(|bc| {
            if bc.version() != version {
                warn!("MINER - block #{} lost the race to a newer tip", block.index);
                return Err(LedgerError::StaleTip);
            }
            bc.accept_block(block.clone())
        })?;
        Ok(block)
    }

    /* -------------------- peer-facing -------------------- */

    pub fn received_block(&self, block: Block) -> Result<BlockOutcome> {
        self.mutate(|bc| {
            let tip = bc.last_block();
            if block.index <= tip.index {
                debug!(
                    "PEER - block #{} is not ahead of our tip #{}",
                    block.index, tip.index
                );
                return Ok(BlockOutcome::Ignored);
            }
            if block.previous_hash != tip.hash {
                info!(
                    "PEER - block #{} does not link to our tip #{}, full chain needed",
                    block.index, tip.index
                );
                return Ok(BlockOutcome::NeedChain);
            }
            bc.accept_block(block)?;
            Ok(BlockOutcome::Appended)
        })
    }

    pub fn received_chain(&self, chain: Vec<Block>) -> Result<()> {
        self.mutate(|bc| bc.replace_chain(chain))
    }

    pub fn received_transaction(&self, tx: Transaction) -> Result<()> {
        self.mutate(|bc| bc.add_to_pool(tx))
    }

    /* -------------------- wallet-facing -------------------- */

    /// Create, sign and pool a payment from this node's wallet.
    pub fn submit_transaction(&self, receiver: &str, amount: u64) -> Result<Transaction> {
        self.mutate(|bc| {
            let tx = self
                .wallet
                .create_transaction(receiver, amount, &bc.utxo(), bc.pool())?;
            bc.add_to_pool(tx.clone())?;
            Ok(tx)
        })
    }
}
