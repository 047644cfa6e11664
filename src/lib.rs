//! A REST API for a personal transaction ledger backed by SQLite.
//!
//! Transactions can be created one at a time or ingested in bulk from CSV
//! files, searched, summarized by year, soft-deleted and restored, and
//! exported back out as CSV. Amounts are converted into INR at fixed rates at
//! write time.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

pub mod app_state;
pub mod db;
pub mod download;
pub mod endpoints;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod pagination;
pub mod rates;
pub mod report;
pub mod routing;
pub mod search;
pub mod selected;
pub mod transaction;

pub use app_state::AppState;
pub use error::Error;
pub use routing::build_router;

/// Have the server shutdown if the user presses CTRL+C or if the program is
/// terminated.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal.");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
