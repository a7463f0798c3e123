use log::debug;
use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};

use crate::error::{LedgerError, Result};
use crate::transaction::validation::validate_address;
use crate::transaction::{Transaction, TransactionPool, TxIn, TxOut, UnspentTxOut, UtxoSet};

/// Holder of the node's key pair. Its public key is the node's address.
#[derive(Clone)]
pub struct Wallet {
    secret: SecretKey,
    public: PublicKey,
}

impl Wallet {
    /// Fresh random key pair.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut OsRng);
        Self { secret, public }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret =
            SecretKey::from_slice(bytes).map_err(|e| LedgerError::Wallet(e.to_string()))?;
        let public = PublicKey::from_secret_key(&Secp256k1::new(), &secret);
        Ok(Self { secret, public })
    }

    pub fn from_private_key_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|_| LedgerError::Wallet("private key is not hex".into()))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Uncompressed public key, hex (`04` + X + Y, 130 chars).
    pub fn public_key(&self) -> String {
        hex::encode(self.public.serialize_uncompressed())
    }

    pub fn private_key(&self) -> String {
        hex::encode(self.secret.secret_bytes())
    }

    /// DER signature (hex) over a transaction id.
    pub fn sign(&self, tx_id: &str) -> Result<String> {
        let msg = id_message(tx_id).map_err(|e| LedgerError::Wallet(e.into()))?;
        let sig = Secp256k1::signing_only().sign_ecdsa(&msg, &self.secret);
        Ok(hex::encode(&sig.serialize_der()[..]))
    }

    /// Spend exactly `coins`, paying `amount` to `receiver` and any leftover
    /// back to this wallet. Every input is signed.
    pub fn spend(&self, coins: &[UnspentTxOut], receiver: &str, amount: u64) -> Result<Transaction> {
        let total = coins.iter().map(|c| c.amount).fold(0u64, u64::saturating_add);
        if total < amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: total,
            });
        }

        let tx_ins = coins
            .iter()
            .map(|c| TxIn {
                tx_out_id: c.tx_out_id.clone(),
                tx_out_index: c.tx_out_index,
                signature: String::new(),
            })
            .collect();

        let mut tx_outs = vec![TxOut {
            address: receiver.to_string(),
            amount,
        }];
        let leftover = total - amount;
        if leftover > 0 {
            tx_outs.push(TxOut {
                address: self.public_key(),
                amount: leftover,
            });
        }

        let mut tx = Transaction::new(tx_ins, tx_outs);
        let signature = self.sign(&tx.id)?;
        // every input belongs to this wallet, so they share one signature
        for txin in &mut tx.tx_ins {
            txin.signature = signature.clone();
        }
        Ok(tx)
    }

    /// Build a signed payment from this wallet's unspent outputs, skipping any
    /// output a pooled transaction already spends.
    pub fn create_transaction(
        &self,
        receiver: &str,
        amount: u64,
        utxo: &UtxoSet,
        pool: &TransactionPool,
    ) -> Result<Transaction> {
        validate_address(receiver)?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("amount must be > 0".into()));
        }

        let reserved = pool.reserved_outpoints();
        let spendable: Vec<UnspentTxOut> = utxo
            .owned_by(&self.public_key())
            .into_iter()
            .filter(|u| !reserved.contains(&u.outpoint()))
            .collect();

        let coins = select_coins(&spendable, amount)?;
        debug!(
            "WALLET - paying {amount} to {receiver} with {} of {} spendable outputs",
            coins.len(),
            spendable.len()
        );
        self.spend(coins, receiver, amount)
    }
}

/// Shortest prefix of `spendable` whose amounts cover `amount`.
fn select_coins(spendable: &[UnspentTxOut], amount: u64) -> Result<&[UnspentTxOut]> {
    let mut sum: u64 = 0;
    for (i, coin) in spendable.iter().enumerate() {
        sum = sum.saturating_add(coin.amount);
        if sum >= amount {
            return Ok(&spendable[..=i]);
        }
    }
    Err(LedgerError::InsufficientFunds {
        requested: amount,
        available: sum,
    })
}

fn id_message(tx_id: &str) -> std::result::Result<Message, &'static str> {
    let digest = hex::decode(tx_id).map_err(|_| "invalid transaction id hex")?;
    Message::from_digest_slice(&digest).map_err(|_| "transaction id is not 32 bytes")
}

/// Verify a signature (hex DER) made over `tx_id` by the owner of `pubkey_hex`.
pub fn verify_signature_hex(
    pubkey_hex: &str,
    sig_hex: &str,
    tx_id: &str,
) -> std::result::Result<bool, &'static str> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex).map_err(|_| "invalid signature hex")?;
    let mut sig = Signature::from_der(&sig_bytes).map_err(|_| "invalid DER signature")?;
    // foreign signers may emit high-S signatures
    sig.normalize_s();

    let pk_bytes = hex::decode(pubkey_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| "invalid pubkey bytes")?;

    let msg = id_message(tx_id)?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}
