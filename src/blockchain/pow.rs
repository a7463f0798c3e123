//! Proof-of-work: target check, nonce search and difficulty retargeting.

use log::{debug, info};
use sha2::{Digest, Sha256};
use std::time::Instant;

use super::block::{Block, block_prefix};
use super::{BLOCK_INTERVAL_SECONDS, RETARGET_INTERVAL_BLOCKS};
use crate::transaction::Transaction;

/// How many nonces are tried between cancellation checks.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// True when the first `difficulty` bits of the hex `hash` are zero.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let Ok(bytes) = hex::decode(hash) else {
        return false;
    };
    let bits = difficulty as usize;
    if bits > bytes.len() * 8 {
        return false;
    }
    let (full, rest) = (bits / 8, bits % 8);
    if bytes[..full].iter().any(|b| *b != 0) {
        return false;
    }
    rest == 0 || bytes[full] >> (8 - rest) == 0
}

/// Brute-force nonce search from 0 upward until the hash meets `difficulty`.
pub fn mine(
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    transactions: Vec<Transaction>,
    difficulty: u32,
) -> Block {
    let mut search = NonceSearch::new(index, previous_hash, timestamp, transactions, difficulty);
    loop {
        if let Some(block) = search.step() {
            return block;
        }
    }
}

/// Same search as [`mine`], abandoned (returning `None`) as soon as
/// `cancelled` reports true. The flag is polled every
/// [`CANCEL_CHECK_INTERVAL`] nonces.
pub fn mine_cancellable(
    index: u64,
    previous_hash: &str,
    timestamp: i64,
    transactions: Vec<Transaction>,
    difficulty: u32,
    cancelled: impl Fn() -> bool,
) -> Option<Block> {
    let started = Instant::now();
    let mut search = NonceSearch::new(index, previous_hash, timestamp, transactions, difficulty);
    loop {
        if search.nonce % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
            debug!(
                "MINER - search for #{index} abandoned after {} nonces",
                search.nonce
            );
            return None;
        }
        if let Some(block) = search.step() {
            let elapsed = started.elapsed().as_millis();
            info!(
                "MINER - block #{} found: nonce={} difficulty={} in {}ms",
                block.index, block.nonce, difficulty, elapsed
            );
            return Some(block);
        }
    }
}

struct NonceSearch {
    index: u64,
    previous_hash: String,
    timestamp: i64,
    transactions: Vec<Transaction>,
    difficulty: u32,
    prefix: Sha256,
    nonce: u64,
}

impl NonceSearch {
    fn new(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        transactions: Vec<Transaction>,
        difficulty: u32,
    ) -> Self {
        let mut prefix = Sha256::new();
        prefix.update(block_prefix(index, previous_hash, timestamp, &transactions));
        Self {
            index,
            previous_hash: previous_hash.to_string(),
            timestamp,
            transactions,
            difficulty,
            prefix,
            nonce: 0,
        }
    }

    /// Hash the current nonce; yield a block if it wins, otherwise advance.
    fn step(&mut self) -> Option<Block> {
        let mut hasher = self.prefix.clone();
        hasher.update(format!("{}{}", self.difficulty, self.nonce));
        let hash = hex::encode(hasher.finalize());
        if meets_difficulty(&hash, self.difficulty) {
            return Some(Block {
                index: self.index,
                hash,
                previous_hash: std::mem::take(&mut self.previous_hash),
                timestamp: self.timestamp,
                transactions: std::mem::take(&mut self.transactions),
                difficulty: self.difficulty,
                nonce: self.nonce,
            });
        }
        self.nonce = self.nonce.wrapping_add(1);
        None
    }
}

/// Difficulty the next block on top of `chain` should be mined at.
pub fn next_difficulty(chain: &[Block]) -> u32 {
    let Some(latest) = chain.last() else {
        return 0;
    };
    if latest.index == 0 || latest.index % RETARGET_INTERVAL_BLOCKS != 0 {
        return latest.difficulty;
    }
    adjusted_difficulty(latest, chain)
}

fn adjusted_difficulty(latest: &Block, chain: &[Block]) -> u32 {
    let interval = RETARGET_INTERVAL_BLOCKS as usize;
    let Some(start) = chain.len().checked_sub(interval).map(|i| &chain[i]) else {
        return latest.difficulty;
    };

    let expected = BLOCK_INTERVAL_SECONDS * RETARGET_INTERVAL_BLOCKS as i64;
    let actual = latest.timestamp - start.timestamp;
    let next = if actual < expected / 2 {
        latest.difficulty.saturating_add(1)
    } else if actual > expected * 2 {
        latest.difficulty.saturating_sub(1)
    } else {
        latest.difficulty
    };
    debug!(
        "retarget at #{}: expected {expected}s, actual {actual}s, difficulty {} -> {next}",
        latest.index, latest.difficulty
    );
    next
}

/// Fork-choice weight: sum of `2^difficulty` over the chain.
pub fn accumulated_difficulty(chain: &[Block]) -> u128 {
    chain
        .iter()
        .map(|b| 1u128.checked_shl(b.difficulty).unwrap_or(u128::MAX))
        .fold(0u128, u128::saturating_add)
}
