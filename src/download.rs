//! CSV export of the full ledger.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    transaction::{Transaction, map_transaction_row},
};

/// Fetch every transaction, deleted or not, ordered by id.
fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, date, description, original_amount, currency, amount_in_inr, is_deleted
             FROM \"appData\"
             ORDER BY id",
        )?
        .query_map((), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Render `transactions` as CSV with a fixed header row.
fn write_csv(transactions: &[Transaction]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "id",
        "date",
        "description",
        "originalAmount",
        "currency",
        "amountInINR",
        "isDeleted",
    ])?;

    for transaction in transactions {
        writer.write_record([
            transaction.id.to_string(),
            transaction.date.to_string(),
            transaction.description.clone(),
            transaction.original_amount.to_string(),
            transaction.currency.clone(),
            transaction.amount_in_inr.to_string(),
            transaction.is_deleted.to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|error| error.into_error().into())
}

/// A route handler that serves the whole ledger as a CSV attachment.
pub async fn download_endpoint(State(state): State<AppState>) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let transactions = get_all_transactions(&connection)?;
    let body =
        write_csv(&transactions).map_err(|error| Error::InvalidCsv(error.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}
