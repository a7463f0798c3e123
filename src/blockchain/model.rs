use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use super::pow::{accumulated_difficulty, meets_difficulty, next_difficulty};
use super::{Block, TIMESTAMP_DRIFT_SECONDS};
use crate::error::{LedgerError, Result};
use crate::transaction::{Transaction, TransactionPool, UtxoSet};

/// In-memory ledger state: the accepted chain, the UTXO set it implies and
/// the pool of pending transactions. The three only ever change together.
#[derive(Debug, Clone)]
pub struct Blockchain {
    chain: Vec<Block>,
    utxo: Arc<UtxoSet>,
    pool: TransactionPool,
    /// Bumped on every accepted block or chain replacement.
    version: u64,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Initialize a new blockchain holding only the genesis block.
    pub fn new() -> Self {
        let genesis = Block::genesis();
        let utxo = UtxoSet::new().update(&genesis.transactions);
        Self {
            chain: vec![genesis],
            utxo: Arc::new(utxo),
            pool: TransactionPool::new(),
            version: 0,
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.chain.iter().find(|b| b.hash == hash)
    }

    /// Shared handle to the current UTXO set.
    pub fn utxo(&self) -> Arc<UtxoSet> {
        Arc::clone(&self.utxo)
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn difficulty(&self) -> u32 {
        next_difficulty(&self.chain)
    }

    pub fn accumulated_difficulty(&self) -> u128 {
        accumulated_difficulty(&self.chain)
    }

    /// Append `block` if it extends the tip and its transactions apply.
    /// On any error nothing changes.
    pub fn accept_block(&mut self, block: Block) -> Result<()> {
        validate_new_block(&block, self.last_block())?;
        let utxo = self.utxo.apply(&block.transactions, block.index)?;

        info!(
            "CHAIN - accepted block #{} ({}), {} txs",
            block.index,
            block.hash,
            block.transactions.len()
        );
        self.chain.push(block);
        self.commit(utxo);
        Ok(())
    }

    /// Switch to `candidate` if it is valid and strictly heavier than the
    /// current chain. On any error nothing changes.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<()> {
        let utxo = validate_chain(&candidate)?;

        let current = self.accumulated_difficulty();
        let weight = accumulated_difficulty(&candidate);
        if weight <= current {
            warn!(
                "CHAIN - candidate of {} blocks is not heavier ({weight} <= {current})",
                candidate.len()
            );
            return Err(LedgerError::WeakerChain {
                candidate: weight,
                current,
            });
        }

        info!(
            "CHAIN - replaced: height {} -> {}, weight {current} -> {weight}",
            self.chain.len(),
            candidate.len()
        );
        self.chain = candidate;
        self.commit(utxo);
        Ok(())
    }

    /// Validate `tx` against the current UTXO set and pool it.
    pub fn add_to_pool(&mut self, tx: Transaction) -> Result<()> {
        self.pool.add(tx, &self.utxo)
    }

    fn commit(&mut self, utxo: UtxoSet) {
        self.utxo = Arc::new(utxo);
        self.pool.reconcile(&self.utxo);
        self.version += 1;
        debug!(
            "CHAIN - v{} height={} utxo_size={} pool_size={}",
            self.version,
            self.chain.len(),
            self.utxo.len(),
            self.pool.len()
        );
    }
}

/// Check `candidate` as the successor of `previous` using the wall clock.
pub fn validate_new_block(candidate: &Block, previous: &Block) -> Result<()> {
    validate_new_block_at(candidate, previous, Utc::now().timestamp())
}

/// Same as [`validate_new_block`] with an explicit `now` (unix seconds).
/// Checks run in a fixed order and the first failure is reported.
pub fn validate_new_block_at(candidate: &Block, previous: &Block, now: i64) -> Result<()> {
    candidate.validate_structure()?;

    if candidate.index != previous.index + 1 {
        return Err(LedgerError::ChainLinkInvalid(format!(
            "index {} does not follow {}",
            candidate.index, previous.index
        )));
    }
    if candidate.previous_hash != previous.hash {
        return Err(LedgerError::ChainLinkInvalid(format!(
            "block #{} points to {} instead of {}",
            candidate.index, candidate.previous_hash, previous.hash
        )));
    }

    if previous.timestamp - TIMESTAMP_DRIFT_SECONDS >= candidate.timestamp {
        return Err(LedgerError::TimestampInvalid(format!(
            "block #{} at {} is too far behind its parent at {}",
            candidate.index, candidate.timestamp, previous.timestamp
        )));
    }
    if candidate.timestamp - TIMESTAMP_DRIFT_SECONDS >= now {
        return Err(LedgerError::TimestampInvalid(format!(
            "block #{} at {} is ahead of local time {now}",
            candidate.index, candidate.timestamp
        )));
    }

    let computed = candidate.compute_hash();
    if computed != candidate.hash {
        return Err(LedgerError::HashInvalid(format!(
            "block #{} claims {} but hashes to {computed}",
            candidate.index, candidate.hash
        )));
    }
    if !meets_difficulty(&candidate.hash, candidate.difficulty) {
        return Err(LedgerError::HashInvalid(format!(
            "block #{} hash {} misses difficulty {}",
            candidate.index, candidate.hash, candidate.difficulty
        )));
    }
    Ok(())
}

/// Replay `candidate` from genesis and return the UTXO set it produces.
pub fn validate_chain(candidate: &[Block]) -> Result<UtxoSet> {
    let Some(first) = candidate.first() else {
        return Err(LedgerError::StructuralInvalid("chain is empty".into()));
    };
    if *first != Block::genesis() {
        return Err(LedgerError::ChainLinkInvalid(
            "first block is not the genesis block".into(),
        ));
    }

    let mut utxo = UtxoSet::new().apply(&first.transactions, first.index)?;
    for pair in candidate.windows(2) {
        let (previous, block) = (&pair[0], &pair[1]);
        validate_new_block(block, previous)?;
        utxo = utxo.apply(&block.transactions, block.index)?;
    }
    Ok(utxo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::pow::mine;
    use crate::blockchain::{COINBASE_REWARD, GENESIS_ADDRESS};
    use crate::error::TxFault;
    use crate::test_support::{chain_of, genesis_wallet, mine_on, signed_spend, wallet};
    use crate::transaction::{TxIn, TxOut, transaction_id};

    #[test]
    fn genesis_only_chain_is_valid() {
        let bc = Blockchain::new();
        let utxo = validate_chain(bc.chain()).unwrap();
        assert_eq!(utxo.len(), 1);
        assert_eq!(utxo.balance_of(GENESIS_ADDRESS), COINBASE_REWARD);
        assert_eq!(&utxo, bc.utxo().as_ref());
    }

    #[test]
    fn genesis_is_pinned() {
        let mut chain = chain_of(&[0], &wallet(1).public_key());
        chain[0].timestamp += 1;
        chain[0].hash = chain[0].compute_hash();
        assert!(matches!(
            validate_chain(&chain),
            Err(LedgerError::ChainLinkInvalid(_))
        ));
        assert!(matches!(
            validate_chain(&[]),
            Err(LedgerError::StructuralInvalid(_))
        ));
    }

    #[test]
    fn spending_genesis_coinbase_rewrites_utxo() {
        let owner = genesis_wallet();
        let bob = wallet(2);
        let mut bc = Blockchain::new();
        let coin = bc.utxo().unspent_outputs().remove(0);

        let spend = signed_spend(&owner, &[coin.clone()], &bob.public_key(), COINBASE_REWARD);
        let block = mine_on(bc.last_block(), vec![spend], 0, &wallet(1).public_key());
        bc.accept_block(block).unwrap();

        let utxo = bc.utxo();
        assert_eq!(utxo.len(), 2);
        assert!(!utxo.contains(&coin.outpoint()));
        assert_eq!(utxo.balance_of(&bob.public_key()), COINBASE_REWARD);
        assert_eq!(utxo.balance_of(&wallet(1).public_key()), COINBASE_REWARD);
        assert_eq!(bc.version(), 1);
    }

    #[test]
    fn validate_new_block_reports_first_failure() {
        let genesis = Block::genesis();
        let miner = wallet(1).public_key();
        let now = Utc::now().timestamp();
        let good = mine_on(&genesis, vec![], 4, &miner);
        assert!(validate_new_block_at(&good, &genesis, now).is_ok());

        let mut skipped = good.clone();
        skipped.index = 2;
        assert!(matches!(
            validate_new_block_at(&skipped, &genesis, now),
            Err(LedgerError::ChainLinkInvalid(_))
        ));

        let mut unlinked = good.clone();
        unlinked.previous_hash = "0".repeat(64);
        assert!(matches!(
            validate_new_block_at(&unlinked, &genesis, now),
            Err(LedgerError::ChainLinkInvalid(_))
        ));

        assert!(matches!(
            validate_new_block_at(&good, &genesis, good.timestamp - 61),
            Err(LedgerError::TimestampInvalid(_))
        ));
        let mut ancient = genesis.clone();
        ancient.timestamp = good.timestamp + 60;
        assert!(matches!(
            validate_new_block_at(&good, &ancient, now),
            Err(LedgerError::TimestampInvalid(_))
        ));

        let mut forged = good.clone();
        forged.nonce += 1;
        assert!(matches!(
            validate_new_block_at(&forged, &genesis, now),
            Err(LedgerError::HashInvalid(_))
        ));

        // hash matches content but the claimed difficulty is unmet
        let mut overclaimed = good.clone();
        overclaimed.difficulty = 255;
        overclaimed.hash = overclaimed.compute_hash();
        assert!(matches!(
            validate_new_block_at(&overclaimed, &genesis, now),
            Err(LedgerError::HashInvalid(_))
        ));
    }

    #[test]
    fn rejected_block_leaves_state_untouched() {
        let mut bc = Blockchain::new();
        let miner = wallet(1).public_key();

        let mut greedy = mine_on(bc.last_block(), vec![], 0, &miner);
        greedy.transactions[0].tx_outs[0].amount = COINBASE_REWARD * 2;
        greedy.transactions[0].id = transaction_id(&greedy.transactions[0]);
        greedy = mine(
            greedy.index,
            &greedy.previous_hash,
            greedy.timestamp,
            greedy.transactions,
            0,
        );

        let before = bc.clone();
        assert!(matches!(
            bc.accept_block(greedy),
            Err(LedgerError::TransactionInvalid(TxFault::BadCoinbase(_)))
        ));
        assert_eq!(bc.chain(), before.chain());
        assert_eq!(bc.utxo(), before.utxo());
        assert_eq!(bc.version(), 0);
    }

    #[test]
    fn second_block_on_same_parent_is_rejected() {
        let mut bc = Blockchain::new();
        let first = mine_on(bc.last_block(), vec![], 0, &wallet(1).public_key());
        let rival = mine_on(bc.last_block(), vec![], 0, &wallet(2).public_key());
        bc.accept_block(first).unwrap();
        assert!(matches!(
            bc.accept_block(rival),
            Err(LedgerError::ChainLinkInvalid(_))
        ));
    }

    #[test]
    fn heavier_chain_wins_at_equal_length() {
        let miner = wallet(1).public_key();
        let light = chain_of(&[1], &miner);
        let heavy = chain_of(&[2], &wallet(2).public_key());

        let mut bc = Blockchain::new();
        bc.replace_chain(light.clone()).unwrap();
        bc.replace_chain(heavy.clone()).unwrap();
        assert_eq!(bc.chain(), heavy.as_slice());
        assert_eq!(bc.utxo().balance_of(&wallet(2).public_key()), COINBASE_REWARD);
        assert_eq!(bc.utxo().balance_of(&miner), 0);

        // lighter and equal chains are refused, state unchanged
        assert!(matches!(
            bc.replace_chain(light),
            Err(LedgerError::WeakerChain { candidate: 3, current: 5 })
        ));
        assert!(matches!(
            bc.replace_chain(heavy.clone()),
            Err(LedgerError::WeakerChain { .. })
        ));
        assert_eq!(bc.chain(), heavy.as_slice());
    }

    #[test]
    fn weight_beats_length() {
        let long = chain_of(&[0, 0], &wallet(1).public_key()); // 1 + 1 + 1
        let short = chain_of(&[2], &wallet(2).public_key()); // 1 + 4
        let mut bc = Blockchain::new();
        bc.replace_chain(long).unwrap();
        bc.replace_chain(short.clone()).unwrap();
        assert_eq!(bc.len(), 2);
    }

    #[test]
    fn invalid_candidate_is_reported_not_applied() {
        let mut bc = Blockchain::new();
        let mut chain = chain_of(&[1, 1], &wallet(1).public_key());
        chain[2].previous_hash = chain[0].hash.clone();
        assert!(bc.replace_chain(chain).is_err());
        assert_eq!(bc.len(), 1);
        assert_eq!(bc.version(), 0);
    }

    #[test]
    fn double_spend_across_blocks_is_rejected() {
        let owner = genesis_wallet();
        let miner = wallet(1).public_key();
        let coin = Blockchain::new().utxo().unspent_outputs().remove(0);

        let first = signed_spend(&owner, &[coin.clone()], &wallet(2).public_key(), 50);
        let again = signed_spend(&owner, &[coin.clone()], &wallet(3).public_key(), 50);

        let mut chain = vec![Block::genesis()];
        chain.push(mine_on(&chain[0], vec![first], 0, &miner));
        chain.push(mine_on(&chain[1], vec![again], 0, &miner));

        assert_eq!(
            validate_chain(&chain),
            Err(TxFault::MissingUtxo(coin.outpoint()).into())
        );
    }

    #[test]
    fn accepted_block_prunes_pool() {
        let owner = genesis_wallet();
        let mut bc = Blockchain::new();
        let coin = bc.utxo().unspent_outputs().remove(0);

        let pooled = signed_spend(&owner, &[coin.clone()], &wallet(2).public_key(), 50);
        bc.add_to_pool(pooled).unwrap();
        assert_eq!(bc.pool().len(), 1);

        let competing = signed_spend(&owner, &[coin], &wallet(3).public_key(), 50);
        let block = mine_on(bc.last_block(), vec![competing], 0, &wallet(1).public_key());
        bc.accept_block(block).unwrap();
        assert!(bc.pool().is_empty());
    }

    #[test]
    fn coinbase_cannot_consume_existing_output() {
        let owner = genesis_wallet();
        let victim = wallet(2).public_key();
        let mut bc = Blockchain::new();
        let coin = bc.utxo().unspent_outputs().remove(0);

        let pay = |amount| TxOut {
            address: victim.clone(),
            amount,
        };
        let mut payout = Transaction::new(
            vec![TxIn {
                tx_out_id: coin.tx_out_id.clone(),
                tx_out_index: coin.tx_out_index,
                signature: String::new(),
            }],
            vec![pay(10), pay(10), pay(30)],
        );
        payout.tx_ins[0].signature = owner.sign(&payout.id).unwrap();
        let block = mine_on(bc.last_block(), vec![payout.clone()], 0, &wallet(1).public_key());
        bc.accept_block(block).unwrap();
        assert_eq!(bc.utxo().balance_of(&victim), 50);

        // height 2 lines up with output 2 of the payout
        let mut coinbase = Transaction::coinbase(&wallet(3).public_key(), 2);
        coinbase.tx_ins[0].tx_out_id = payout.id.clone();
        coinbase.tx_ins[0].signature = "3044".into();
        coinbase.id = transaction_id(&coinbase);
        let tip = bc.last_block().clone();
        let raid = mine(2, &tip.hash, Utc::now().timestamp(), vec![coinbase], 0);

        assert!(matches!(
            bc.accept_block(raid),
            Err(LedgerError::TransactionInvalid(TxFault::BadCoinbase(_)))
        ));
        assert_eq!(bc.len(), 2);
        assert_eq!(bc.utxo().balance_of(&victim), 50);
    }
}
