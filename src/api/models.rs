use serde::{Deserialize, Serialize};

use crate::blockchain::Block;
use crate::node::{BlockOutcome, ChainStats};
use crate::transaction::{Transaction, UnspentTxOut};

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: usize,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct BlockOutcomeResponse {
    pub outcome: BlockOutcome,
}

#[derive(Serialize)]
pub struct ReplaceResponse {
    pub replaced: bool,
    pub length: usize,
}

/* ---------- Mining API Models ---------- */

#[derive(Deserialize)]
pub struct MineRawRequest {
    /// Full block body, coinbase first.
    pub transactions: Vec<Transaction>,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct SendRequest {
    pub address: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct PoolResponse {
    pub size: usize,
    pub transactions: Vec<Transaction>,
}

#[derive(Serialize)]
pub struct UtxoResponse {
    pub size: usize,
    pub unspent: Vec<UnspentTxOut>,
}

/* ---------- Wallet API Models ---------- */

#[derive(Serialize)]
pub struct AddressResponse {
    pub address: String,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u64,
    pub utxos: usize,
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub chain: ChainStats,
    pub target_block_time_secs: i64,
    pub retarget_interval_blocks: u64,
}
