//! Pure checks over transactions: shape, ids, signatures and balance.
//!
//! Nothing here mutates state; every check reports the specific reason it
//! failed so callers can surface it unchanged.

use log::debug;
use std::collections::HashSet;

use super::model::{Transaction, TxIn, transaction_id};
use super::utxo::UtxoSet;
use crate::blockchain::COINBASE_REWARD;
use crate::error::{LedgerError, Result, TxFault};
use crate::wallet::verify_signature_hex;

/// Length of a hex-encoded uncompressed secp256k1 public key.
pub const ADDRESS_HEX_LEN: usize = 130;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

pub fn is_hash_hex(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Address must be a hex uncompressed curve point: `04` + X + Y.
pub fn validate_address(address: &str) -> Result<()> {
    if address.len() != ADDRESS_HEX_LEN {
        return Err(LedgerError::InvalidAddress(format!(
            "expected {ADDRESS_HEX_LEN} hex chars, got {}",
            address.len()
        )));
    }
    if !address.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(LedgerError::InvalidAddress(
            "address must contain only hex characters".into(),
        ));
    }
    if !address.starts_with("04") {
        return Err(LedgerError::InvalidAddress(
            "address must start with 04".into(),
        ));
    }
    Ok(())
}

/// Field-level shape of a transaction, independent of any UTXO state.
pub fn validate_transaction_structure(tx: &Transaction) -> Result<()> {
    if !is_hash_hex(&tx.id) {
        return Err(LedgerError::StructuralInvalid(format!(
            "transaction id {:?} is not a sha256 hex digest",
            tx.id
        )));
    }
    for txin in &tx.tx_ins {
        // coinbase inputs reference nothing
        if !txin.tx_out_id.is_empty() && !is_hash_hex(&txin.tx_out_id) {
            return Err(LedgerError::StructuralInvalid(format!(
                "txIn of {} references malformed id {:?}",
                tx.id, txin.tx_out_id
            )));
        }
        if !txin.signature.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(LedgerError::StructuralInvalid(format!(
                "txIn of {} carries a non-hex signature",
                tx.id
            )));
        }
    }
    for txout in &tx.tx_outs {
        validate_address(&txout.address)
            .map_err(|e| LedgerError::StructuralInvalid(format!("txOut of {}: {e}", tx.id)))?;
    }
    Ok(())
}

fn check_id(tx: &Transaction) -> Result<()> {
    let computed = transaction_id(tx);
    if computed != tx.id {
        return Err(TxFault::IdMismatch {
            stored: tx.id.clone(),
            computed,
        }
        .into());
    }
    Ok(())
}

/// Input must reference an unspent output and be signed by that output's owner.
/// Returns the referenced amount.
pub fn validate_tx_in(txin: &TxIn, tx: &Transaction, utxo: &UtxoSet) -> Result<u64> {
    let outpoint = txin.outpoint();
    let referenced = utxo
        .get(&outpoint)
        .ok_or_else(|| TxFault::MissingUtxo(outpoint.clone()))?;

    let verified = verify_signature_hex(&referenced.address, &txin.signature, &tx.id)
        .unwrap_or_else(|reason| {
            debug!("signature check for {outpoint} failed early: {reason}");
            false
        });
    if !verified {
        return Err(TxFault::BadSignature(outpoint).into());
    }
    Ok(referenced.amount)
}

/// Full check of a regular (non-coinbase) transaction against `utxo`.
pub fn validate_transaction(tx: &Transaction, utxo: &UtxoSet) -> Result<()> {
    check_id(tx)?;

    let mut inputs: u128 = 0;
    for txin in &tx.tx_ins {
        inputs += validate_tx_in(txin, tx, utxo)? as u128;
    }

    let outputs = tx.total_output_amount();
    if inputs != outputs {
        return Err(TxFault::Unbalanced { inputs, outputs }.into());
    }
    Ok(())
}

pub fn validate_coinbase(tx: &Transaction, block_index: u64) -> Result<()> {
    check_id(tx)?;
    let bad = |msg: String| -> Result<()> { Err(TxFault::BadCoinbase(msg).into()) };

    if tx.tx_ins.len() != 1 {
        return bad(format!("expected exactly one txIn, got {}", tx.tx_ins.len()));
    }
    let txin = &tx.tx_ins[0];
    if !txin.tx_out_id.is_empty() || !txin.signature.is_empty() {
        // the coinbase input spends nothing
        return bad(format!(
            "txIn must be empty, references {:?} with signature {:?}",
            txin.tx_out_id, txin.signature
        ));
    }
    if txin.tx_out_index as u64 != block_index {
        return bad(format!(
            "txIn index {} must equal block height {block_index}",
            txin.tx_out_index
        ));
    }
    if tx.tx_outs.len() != 1 {
        return bad(format!("expected exactly one txOut, got {}", tx.tx_outs.len()));
    }
    if tx.tx_outs[0].amount != COINBASE_REWARD {
        return bad(format!(
            "reward {} differs from {COINBASE_REWARD}",
            tx.tx_outs[0].amount
        ));
    }
    Ok(())
}

/// First repeated `(txOutId, txOutIndex)` across every input of `transactions`.
pub fn find_duplicate_input(transactions: &[Transaction]) -> Option<TxIn> {
    let mut seen = HashSet::new();
    transactions
        .iter()
        .flat_map(|tx| tx.tx_ins.iter())
        .find(|txin| !seen.insert(txin.outpoint()))
        .cloned()
}

/// Validate a list as a block body: coinbase first, no input used twice,
/// every other transaction valid against `utxo`.
pub fn validate_block_transactions(
    transactions: &[Transaction],
    utxo: &UtxoSet,
    block_index: u64,
) -> Result<()> {
    let Some(coinbase) = transactions.first() else {
        return Err(TxFault::BadCoinbase("block has no transactions".into()).into());
    };
    validate_coinbase(coinbase, block_index)?;

    if let Some(dup) = find_duplicate_input(transactions) {
        return Err(TxFault::DuplicateInput(dup.outpoint()).into());
    }

    for tx in &transactions[1..] {
        validate_transaction(tx, utxo)?;
    }
    Ok(())
}
