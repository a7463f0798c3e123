use actix_web::{HttpResponse, Responder, post, web};
use log::{error, info};

use super::models::{MineRawRequest, SendRequest};
use super::rejected;
use crate::blockchain::Block;
use crate::error::Result;
use crate::node::Node;

/// Run a mining job on the blocking pool so the nonce search never ties up an
/// async worker.
async fn run_miner(
    route: &str,
    node: web::Data<Node>,
    job: impl FnOnce(&Node) -> Result<Block> + Send + 'static,
) -> HttpResponse {
    match web::block(move || job(node.get_ref())).await {
        Ok(Ok(block)) => {
            info!(
                "{route} - sealed block #{} (hash={}, nonce={}, difficulty={})",
                block.index, block.hash, block.nonce, block.difficulty
            );
            HttpResponse::Ok().json(block)
        }
        Ok(Err(e)) => rejected(route, e),
        Err(e) => {
            error!("{route} - mining task failed: {e}");
            HttpResponse::InternalServerError().body("mining task failed")
        }
    }
}

/// Mine the coinbase plus everything in the transaction pool.
#[post("/mine/")]
pub async fn mine_block(node: web::Data<Node>) -> impl Responder {
    run_miner("POST /mine/", node, |n| n.mine_pool()).await
}

/// Mine a caller-supplied block body as-is.
#[post("/mine/raw/")]
pub async fn mine_raw_block(
    node: web::Data<Node>,
    body: web::Json<MineRawRequest>,
) -> impl Responder {
    let txs = body.into_inner().transactions;
    run_miner("POST /mine/raw/", node, move |n| n.mine_raw(txs)).await
}

/// Pay `address` from the node wallet in a freshly mined block.
#[post("/mine/transaction/")]
pub async fn mine_transaction(
    node: web::Data<Node>,
    body: web::Json<SendRequest>,
) -> impl Responder {
    let SendRequest { address, amount } = body.into_inner();
    run_miner("POST /mine/transaction/", node, move |n| {
        n.mine_transaction(address.trim(), amount)
    })
    .await
}
