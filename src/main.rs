mod api;
mod blockchain;
mod config;
mod error;
mod node;
mod transaction;
mod wallet;

#[cfg(test)]
mod test_support;

use actix_web::{App, HttpServer, web};
use log::info;
use std::io;

use config::Config;
use node::Node;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env();
    env_logger::init();

    let wallet = config
        .wallet()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let node = web::Data::new(Node::new(wallet));

    info!("⛓️ Starting ledger node at http://{}:{}", config.host, config.port);
    info!("node address {}", node.address());

    HttpServer::new(move || {
        App::new()
            .app_data(node.clone())
            .app_data(web::JsonConfig::default().limit(16 * 1024 * 1024))
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
