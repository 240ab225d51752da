//! Local development hub for Everywhere notebook sharing.
//!
//! Serves the sharing API under `/api/v1` backed by a sled database so the
//! editor can share, update and open notebooks without the hosted service.

use std::process::exit;
use std::sync::Arc;

use everywhere::config::HubConfig;
use everywhere::hub::{self, HubState};
use everywhere::store::LocalStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("everywhere=info")),
        )
        .init();

    let config = match HubConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            exit(1);
        }
    };

    let store = match LocalStore::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open database at {}: {}", config.db_path.display(), e);
            exit(1);
        }
    };

    let bind = config.bind;
    let max_bytes = config.max_notebook_bytes;
    let db_path = config.db_path.clone();
    let app = hub::router(Arc::new(HubState::new(store, config)));

    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", bind, e);
            exit(1);
        }
    };

    println!("Sharing hub running at http://{}/api/v1", bind);
    println!("Database: {}", db_path.display());
    println!("Maximum notebook size: {} bytes", max_bytes);
    info!("Hub ready");

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        exit(1);
    }
}
