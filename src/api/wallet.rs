use actix_web::{HttpResponse, Responder, get, web};

use super::models::AddressResponse;
use crate::node::Node;

#[get("/address/")]
pub async fn get_address(node: web::Data<Node>) -> impl Responder {
    HttpResponse::Ok().json(AddressResponse {
        address: node.address(),
    })
}
