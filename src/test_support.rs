//! Helpers shared by unit tests.

use chrono::Utc;

use crate::blockchain::Block;
use crate::blockchain::pow::mine;
use crate::transaction::{Transaction, UnspentTxOut, coinbase_height};
use crate::wallet::Wallet;

/// Secret key behind `GENESIS_ADDRESS`.
pub const GENESIS_KEY: &str = "941debe5a937e5ab67920c0d53993d2396bd37eba3f26ed5fbfce7500c838367";

pub fn genesis_wallet() -> Wallet {
    Wallet::from_private_key_hex(GENESIS_KEY).unwrap()
}

/// Deterministic wallet; distinct seeds give distinct keys.
pub fn wallet(seed: u8) -> Wallet {
    Wallet::from_secret_bytes(&[seed; 32]).unwrap()
}

pub fn signed_spend(
    owner: &Wallet,
    coins: &[UnspentTxOut],
    receiver: &str,
    amount: u64,
) -> Transaction {
    owner.spend(coins, receiver, amount).unwrap()
}

/// Mine a block on `previous` paying the coinbase to `miner`.
pub fn mine_on(previous: &Block, extra: Vec<Transaction>, difficulty: u32, miner: &str) -> Block {
    let index = previous.index + 1;
    let mut txs = vec![Transaction::coinbase(miner, coinbase_height(index).unwrap())];
    txs.extend(extra);
    mine(
        index,
        &previous.hash,
        Utc::now().timestamp(),
        txs,
        difficulty,
    )
}

/// Genesis followed by `difficulties.len()` empty blocks.
pub fn chain_of(difficulties: &[u32], miner: &str) -> Vec<Block> {
    let mut chain = vec![Block::genesis()];
    for d in difficulties {
        let next = mine_on(chain.last().unwrap(), vec![], *d, miner);
        chain.push(next);
    }
    chain
}
