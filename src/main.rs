//! school_desk server
//!
//! Opens the sled document store and serves the REST API.
//!
//! Usage:
//!   cargo run --bin load_data      # seed a demo school
//!   cargo run --bin school_desk    # start server
//!   cargo run --bin school-cli -- login --role teacher ...

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use school_desk::config::Config;
use school_desk::rest::{create_router, AppState};
use school_desk::storage::Storage;
use school_desk::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let _log_guard = logging::init(&config);

    let storage = Storage::open(&config.data_dir)?;
    info!(data_dir = %config.data_dir.display(), "document store opened");

    let state = Arc::new(AppState {
        storage: storage.clone(),
        bcrypt_cost: config.bcrypt_cost,
    });
    let app = create_router(state);

    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "school_desk REST API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    storage.flush().await?;
    Ok(())
}
