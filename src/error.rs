//! Defines the app level error type and its mapping onto JSON HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request was missing fields or contained malformed values.
    #[error("{0}")]
    Validation(String),

    /// The currency code is not present in the rate table.
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// A live transaction with the same date and description already exists.
    #[error("Transaction with same date and description already exists")]
    DuplicateTransaction,

    /// The uploaded file violated the type or size constraints.
    #[error("{0}")]
    InvalidFile(String),

    /// The requested transaction was not found.
    ///
    /// The client should check that the ID is correct and, for routes that
    /// only see live rows, that the transaction has not been soft-deleted.
    #[error("Transaction not found")]
    NotFound,

    /// The CSV file could not be processed as a whole.
    ///
    /// Row-level problems never raise this error, they become warnings.
    #[error("{0}")]
    InvalidCsv(String),

    /// The multipart form could not be read.
    #[error("Could not parse multipart form: {0}")]
    Multipart(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {error}");
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Error::InvalidCurrency(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::DuplicateTransaction => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::InvalidFile(message) => (StatusCode::BAD_REQUEST, message),
            Error::Multipart(message) => (StatusCode::BAD_REQUEST, message),
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::InvalidCsv(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Error::SqlError(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {error}"),
            ),
            Error::DatabaseLock => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn no_rows_maps_to_not_found() {
        let error = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let response = Error::Validation("bad input".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = Error::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn csv_pipeline_failures_are_server_errors() {
        let response = Error::InvalidCsv("CSV file is empty".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
