mod balance;
mod chain;
mod health;
pub mod models;
mod mining;
mod stats;
mod tx;
mod wallet;

use actix_web::HttpResponse;
use actix_web::web::{self, ServiceConfig};
use log::warn;

use crate::error::LedgerError;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_blocks)
            .service(chain::get_block)
            .service(chain::post_block)
            .service(chain::post_chain)
            .service(mining::mine_block)
            .service(mining::mine_raw_block)
            .service(mining::mine_transaction)
            .service(tx::get_transaction_pool)
            .service(tx::post_transaction)
            .service(tx::receive_transaction)
            .service(tx::get_unspent_outputs)
            .service(tx::get_my_unspent_outputs)
            .service(balance::get_my_balance)
            .service(balance::get_balance)
            .service(wallet::get_address)
            .service(stats::get_stats),
    );
}

/// Every ledger rejection is the caller's problem: 400 with the reason.
pub(crate) fn rejected(route: &str, err: LedgerError) -> HttpResponse {
    warn!("{route} - rejected: {err}");
    HttpResponse::BadRequest().body(err.to_string())
}
