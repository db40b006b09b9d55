mod aggregate;
mod cache;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod results;

use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use cache::RedisCache;
use config::Config;
use db::Database;
use results::Coordinator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::load();

    // Client lifecycle lives here; the coordinator only borrows the handles.
    let database = match Database::connect(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to connect to vote store: {e}");
            return;
        }
    };

    let cache = match RedisCache::connect(&config.redis_url).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!("Failed to connect to cache: {e}");
            return;
        }
    };

    let coordinator = Arc::new(Coordinator::new(database, cache, config.ttl.clone()));
    let app = handlers::router(coordinator);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {address}: {e}");
            return;
        }
    };

    info!("Serving vote tallies on {address}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {e}");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install ctrl-c handler: {e}");
        return;
    }
    info!("Shutting down");
}
