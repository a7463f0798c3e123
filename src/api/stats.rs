use actix_web::{HttpResponse, Responder, get, web};

use super::models::StatsResponse;
use crate::blockchain::{BLOCK_INTERVAL_SECONDS, RETARGET_INTERVAL_BLOCKS};
use crate::node::Node;

#[get("/stats/")]
pub async fn get_stats(node: web::Data<Node>) -> impl Responder {
    HttpResponse::Ok().json(StatsResponse {
        chain: node.stats(),
        target_block_time_secs: BLOCK_INTERVAL_SECONDS,
        retarget_interval_blocks: RETARGET_INTERVAL_BLOCKS,
    })
}
