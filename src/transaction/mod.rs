pub mod model;
pub mod pool;
pub mod utxo;
pub mod validation;

pub use model::{Transaction, TxIn, TxOut, coinbase_height, transaction_id};
pub use pool::TransactionPool;
pub use utxo::{OutPoint, UnspentTxOut, UtxoSet};
