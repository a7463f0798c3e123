use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info};

use super::models::{BlockOutcomeResponse, ChainResponse, ReplaceResponse};
use super::rejected;
use crate::blockchain::Block;
use crate::node::Node;

/// Get the full blockchain.
#[get("/blocks/")]
pub async fn get_blocks(node: web::Data<Node>) -> impl Responder {
    let chain = node.current_chain();
    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

#[get("/blocks/{hash}/")]
pub async fn get_block(node: web::Data<Node>, path: web::Path<(String,)>) -> impl Responder {
    let hash = path.into_inner().0;
    match node.block(&hash) {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound().body(format!("no block with hash {hash}")),
    }
}

/// A block announced by a peer.
#[post("/blocks/")]
pub async fn post_block(node: web::Data<Node>, body: web::Json<Block>) -> impl Responder {
    let block = body.into_inner();
    debug!("POST /blocks/ - received #{} ({})", block.index, block.hash);
    match node.received_block(block) {
        Ok(outcome) => HttpResponse::Ok().json(BlockOutcomeResponse { outcome }),
        Err(e) => rejected("POST /blocks/", e),
    }
}

/// A peer's full chain, adopted only if valid and heavier than ours.
#[post("/chain/")]
pub async fn post_chain(node: web::Data<Node>, body: web::Json<Vec<Block>>) -> impl Responder {
    let candidate = body.into_inner();
    let length = candidate.len();
    match node.received_chain(candidate) {
        Ok(()) => {
            info!("POST /chain/ - adopted chain of {length} blocks");
            HttpResponse::Ok().json(ReplaceResponse {
                replaced: true,
                length,
            })
        }
        Err(e) => rejected("POST /chain/", e),
    }
}
