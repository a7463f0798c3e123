pub mod block;
pub mod model;
pub mod pow;

pub use block::Block;
pub use model::Blockchain;

/// Amount minted by every coinbase transaction.
pub const COINBASE_REWARD: u64 = 50;

/// Target seconds per block for retargeting.
pub const BLOCK_INTERVAL_SECONDS: i64 = 10;

/// Difficulty is re-evaluated every this many blocks.
pub const RETARGET_INTERVAL_BLOCKS: u64 = 10;

/// Allowed clock skew for block timestamps.
pub const TIMESTAMP_DRIFT_SECONDS: i64 = 60;

pub const GENESIS_TIMESTAMP: i64 = 1_465_154_705;

/// Recipient of the genesis coinbase.
pub const GENESIS_ADDRESS: &str = "04eb7775a75b2cd012f46e8f7a6f8ceb9dcfe35b2068bafc9a26d411e3cc75c855ed54db7981e21dd3af544ff1129d5f31f9df9e9f52fd93abad486aecb58e1877";

pub const GENESIS_HASH: &str = "51fe87db0c0d8e0a76789bcbcf293e753a3e6db9809806e406748feeace9afe8";
