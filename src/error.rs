//! Rejection reasons surfaced by the ledger core.

use thiserror::Error;

use crate::transaction::OutPoint;

/// Why a single transaction (or a transaction list) was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxFault {
    #[error("id {stored} does not match recomputed id {computed}")]
    IdMismatch { stored: String, computed: String },

    #[error("signature does not verify for input {0}")]
    BadSignature(OutPoint),

    #[error("referenced output {0} is not unspent")]
    MissingUtxo(OutPoint),

    #[error("inputs total {inputs} but outputs total {outputs}")]
    Unbalanced { inputs: u128, outputs: u128 },

    #[error("output {0} is spent more than once")]
    DuplicateInput(OutPoint),

    #[error("bad coinbase: {0}")]
    BadCoinbase(String),

    #[error("input {0} is already spent by a pooled transaction")]
    PoolConflict(OutPoint),

    #[error("transaction {0} is already pooled")]
    AlreadyPooled(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("malformed structure: {0}")]
    StructuralInvalid(String),

    #[error("chain link broken: {0}")]
    ChainLinkInvalid(String),

    #[error("timestamp out of range: {0}")]
    TimestampInvalid(String),

    #[error("invalid hash: {0}")]
    HashInvalid(String),

    #[error("invalid transaction: {0}")]
    TransactionInvalid(#[from] TxFault),

    #[error("insufficient funds: requested {requested}, spendable {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("candidate chain weight {candidate} does not exceed current weight {current}")]
    WeakerChain { candidate: u128, current: u128 },

    #[error("chain tip moved while mining")]
    StaleTip,

    #[error("wallet key error: {0}")]
    Wallet(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
