use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info};
use std::time::Instant;

use super::models::{PoolResponse, SendRequest, UtxoResponse};
use super::rejected;
use crate::node::Node;
use crate::transaction::Transaction;

/// Pay `address` from the node wallet via the transaction pool.
#[post("/transactions/")]
pub async fn post_transaction(
    node: web::Data<Node>,
    body: web::Json<SendRequest>,
) -> impl Responder {
    let t0 = Instant::now();
    let SendRequest { address, amount } = body.into_inner();
    debug!("POST /transactions/ - {amount} to {address}");

    match node.submit_transaction(address.trim(), amount) {
        Ok(tx) => {
            info!(
                "POST /transactions/ - txid={} pooled ({} ms)",
                tx.id,
                t0.elapsed().as_millis()
            );
            HttpResponse::Ok().json(tx)
        }
        Err(e) => rejected("POST /transactions/", e),
    }
}

/// A transaction relayed by a peer.
#[post("/transactions/receive/")]
pub async fn receive_transaction(
    node: web::Data<Node>,
    body: web::Json<Transaction>,
) -> impl Responder {
    let tx = body.into_inner();
    let id = tx.id.clone();
    match node.received_transaction(tx) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "id": id })),
        Err(e) => rejected("POST /transactions/receive/", e),
    }
}

#[get("/transaction-pool/")]
pub async fn get_transaction_pool(node: web::Data<Node>) -> impl Responder {
    let transactions = node.pool_snapshot();
    HttpResponse::Ok().json(PoolResponse {
        size: transactions.len(),
        transactions,
    })
}

#[get("/utxos/")]
pub async fn get_unspent_outputs(node: web::Data<Node>) -> impl Responder {
    let unspent = node.utxo_snapshot().unspent_outputs();
    HttpResponse::Ok().json(UtxoResponse {
        size: unspent.len(),
        unspent,
    })
}

#[get("/utxos/mine/")]
pub async fn get_my_unspent_outputs(node: web::Data<Node>) -> impl Responder {
    let unspent = node.my_unspent_outputs();
    HttpResponse::Ok().json(UtxoResponse {
        size: unspent.len(),
        unspent,
    })
}
