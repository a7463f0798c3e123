use log::warn;
use std::env;

use crate::error::Result;
use crate::wallet::Wallet;

/// Process settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Hex secp256k1 secret; a throwaway key is generated when unset.
    pub private_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let private_key = env::var("NODE_PRIVATE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self {
            host,
            port,
            private_key,
        }
    }

    pub fn wallet(&self) -> Result<Wallet> {
        match &self.private_key {
            Some(key) => Wallet::from_private_key_hex(key),
            None => {
                warn!("NODE_PRIVATE_KEY not set, using an ephemeral wallet");
                Ok(Wallet::generate())
            }
        }
    }
}
