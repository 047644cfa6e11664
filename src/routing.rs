//! Defines the routes and their handlers for the application.

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::{
    AppState,
    download::download_endpoint,
    endpoints,
    ingest::upload_csv_endpoint,
    report::report_endpoint,
    search::search_endpoint,
    selected::delete_selected_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transactions_endpoint,
        restore_endpoint, soft_delete_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_transactions_endpoint))
        .route(endpoints::ADD_TRANSACTION, post(create_transaction_endpoint))
        .route(
            endpoints::UPDATE_TRANSACTION,
            put(update_transaction_endpoint),
        )
        .route(
            endpoints::DELETE_TRANSACTION,
            delete(delete_transaction_endpoint),
        )
        .route(endpoints::SOFT_DELETE, put(soft_delete_endpoint))
        .route(endpoints::RESTORE, put(restore_endpoint))
        .route(endpoints::DELETE_SELECTED, delete(delete_selected_endpoint))
        .route(endpoints::UPLOAD_CSV, post(upload_csv_endpoint))
        .route(endpoints::SEARCH, get(search_endpoint))
        .route(endpoints::REPORT, get(report_endpoint))
        .route(endpoints::DOWNLOAD, get(download_endpoint))
        .with_state(state)
}
