use actix_web::{HttpResponse, Responder, get, web};

use super::models::BalanceResponse;
use crate::node::Node;

fn balance_response(node: &Node, address: String) -> HttpResponse {
    // one snapshot for both numbers
    let utxo = node.utxo_snapshot();
    HttpResponse::Ok().json(BalanceResponse {
        balance: utxo.balance_of(&address),
        utxos: utxo.owned_by(&address).len(),
        address,
    })
}

#[get("/balance/")]
pub async fn get_my_balance(node: web::Data<Node>) -> impl Responder {
    balance_response(&node, node.address())
}

#[get("/balance/{address}/")]
pub async fn get_balance(node: web::Data<Node>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    balance_response(&node, address)
}
