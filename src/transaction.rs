//! Transaction management for the ledger.
//!
//! This module contains everything related to single transactions:
//! - The `Transaction` model and the validated request payloads
//! - Database functions for storing, querying, and mutating transactions
//! - Route handlers for the CRUD, soft-delete, and restore endpoints

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error,
    normalize::{date_in_bounds, normalize_description, parse_api_date},
    pagination::{PageQuery, page_count},
    rates::{canonical_currency, conversion_rate},
};

// ============================================================================
// MODELS
// ============================================================================

/// A financial transaction, the sole persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: i64,
    /// The transaction's effective date (no time component).
    pub date: Date,
    /// Normalized free-text description of the transaction.
    pub description: String,
    /// The amount in the transaction's own currency. Always positive.
    pub original_amount: f64,
    /// The canonicalized 3-letter currency code.
    pub currency: String,
    /// The amount converted into INR. Derived, never edited independently.
    #[serde(rename = "amountInINR")]
    pub amount_in_inr: f64,
    /// Soft-delete marker.
    pub is_deleted: bool,
}

/// A validated, fully normalized transaction ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The transaction's effective date.
    pub date: Date,
    /// The normalized description.
    pub description: String,
    /// The positive amount in `currency`'s denomination.
    pub original_amount: f64,
    /// The canonicalized currency code, known to the rate table.
    pub currency: String,
    /// `original_amount` converted into INR.
    pub amount_in_inr: f64,
}

/// One page of transactions plus pagination metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionPage {
    /// The transactions on this page, ordered by date descending.
    pub transactions: Vec<Transaction>,
    /// The total number of matching transactions across all pages.
    pub total: u64,
    /// The 1-based page number.
    pub page: u64,
    /// The total number of pages.
    pub pages: u64,
}

/// The request body for creating a transaction.
///
/// Fields are optional and the date is a raw string so that missing or
/// malformed input surfaces as a 400 with a message instead of an extractor
/// rejection. [CreateTransactionRequest::validate] produces the typed command.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTransactionRequest {
    /// The transaction date as a strict `YYYY-MM-DD` string.
    pub date: Option<String>,
    /// The free-text description.
    pub description: Option<String>,
    /// The positive amount in `currency`'s denomination.
    #[serde(rename = "originalAmount")]
    pub original_amount: Option<f64>,
    /// The currency code, canonicalized during validation.
    pub currency: Option<String>,
}

impl CreateTransactionRequest {
    /// Validate the payload into a [NewTransaction].
    ///
    /// # Errors
    /// Returns [Error::Validation] for missing fields, a non-positive amount,
    /// or a malformed/out-of-bounds date, and [Error::InvalidCurrency] for a
    /// currency absent from the rate table.
    pub fn validate(self) -> Result<NewTransaction, Error> {
        let (Some(date), Some(description), Some(original_amount), Some(currency)) =
            (self.date, self.description, self.original_amount, self.currency)
        else {
            return Err(missing_fields_error());
        };

        if description.trim().is_empty() || currency.trim().is_empty() {
            return Err(missing_fields_error());
        }

        let parsed_date = validate_date(&date)?;
        let original_amount = validate_amount(original_amount)?;
        let currency = canonical_currency(&currency);
        let rate =
            conversion_rate(&currency).ok_or_else(|| Error::InvalidCurrency(currency.clone()))?;

        Ok(NewTransaction {
            date: parsed_date,
            description: normalize_description(&description),
            original_amount,
            currency,
            amount_in_inr: original_amount * rate,
        })
    }
}

/// The request body for partially updating a transaction.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransactionRequest {
    /// Replacement date as a strict `YYYY-MM-DD` string.
    pub date: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement amount.
    #[serde(rename = "originalAmount")]
    pub original_amount: Option<f64>,
    /// Replacement currency code.
    pub currency: Option<String>,
}

/// Validated field changes for a partial update. Absent fields are untouched.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionChanges {
    /// Replacement date, already bounds-checked.
    pub date: Option<Date>,
    /// Replacement description, already normalized.
    pub description: Option<String>,
    /// Replacement amount, already checked positive.
    pub original_amount: Option<f64>,
    /// Replacement currency, already canonicalized and known to the rate table.
    pub currency: Option<String>,
}

impl UpdateTransactionRequest {
    /// Validate the supplied fields into [TransactionChanges].
    ///
    /// The same checks as on create apply, but only to fields that are present.
    pub fn validate(self) -> Result<TransactionChanges, Error> {
        let date = self.date.as_deref().map(validate_date).transpose()?;
        let original_amount = self.original_amount.map(validate_amount).transpose()?;

        let description = self
            .description
            .as_deref()
            .map(normalize_description);

        let currency = match self.currency {
            None => None,
            Some(raw) => {
                let currency = canonical_currency(&raw);
                if conversion_rate(&currency).is_none() {
                    return Err(Error::InvalidCurrency(currency));
                }
                Some(currency)
            }
        };

        Ok(TransactionChanges {
            date,
            description,
            original_amount,
            currency,
        })
    }
}

fn missing_fields_error() -> Error {
    Error::Validation("Please provide all the required fields".to_owned())
}

fn validate_date(raw: &str) -> Result<Date, Error> {
    let date = parse_api_date(raw)
        .ok_or_else(|| Error::Validation(format!("Invalid date format: {raw}")))?;

    if !date_in_bounds(date) {
        return Err(Error::Validation(format!("Invalid date: {raw}")));
    }

    Ok(date)
}

fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount > 0.0 && amount.is_finite() {
        Ok(amount)
    } else {
        Err(Error::Validation(
            "originalAmount must be a positive number".to_owned(),
        ))
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// The table name `appData` is kept from the original schema.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"appData\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                original_amount REAL NOT NULL,
                currency TEXT NOT NULL,
                amount_in_inr REAL NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        original_amount: row.get(3)?,
        currency: row.get(4)?,
        amount_in_inr: row.get(5)?,
        is_deleted: row.get(6)?,
    })
}

const TRANSACTION_COLUMNS: &str =
    "id, date, description, original_amount, currency, amount_in_inr, is_deleted";

/// Persist a validated transaction and return the stored row.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"appData\" (date, description, original_amount, currency, amount_in_inr)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                new_transaction.date,
                new_transaction.description,
                new_transaction.original_amount,
                new_transaction.currency,
                new_transaction.amount_in_inr,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`, deleted or not.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: i64, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"appData\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Apply `changes` to the transaction with `id` and return the updated row.
///
/// `amount_in_inr` is recomputed from the current rate table whenever the
/// amount or the currency changes.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction, or
/// [Error::SqlError] on SQL errors.
pub fn update_transaction(
    id: i64,
    changes: TransactionChanges,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let mut transaction = get_transaction(id, connection)?;
    let recompute = changes.original_amount.is_some() || changes.currency.is_some();

    if let Some(date) = changes.date {
        transaction.date = date;
    }
    if let Some(description) = changes.description {
        transaction.description = description;
    }
    if let Some(currency) = changes.currency {
        transaction.currency = currency;
    }
    if let Some(original_amount) = changes.original_amount {
        transaction.original_amount = original_amount;
    }

    if recompute {
        let rate = conversion_rate(&transaction.currency)
            .ok_or_else(|| Error::InvalidCurrency(transaction.currency.clone()))?;
        transaction.amount_in_inr = transaction.original_amount * rate;
    }

    connection.execute(
        "UPDATE \"appData\"
         SET date = ?1, description = ?2, original_amount = ?3, currency = ?4, amount_in_inr = ?5
         WHERE id = ?6",
        (
            transaction.date,
            &transaction.description,
            transaction.original_amount,
            &transaction.currency,
            transaction.amount_in_inr,
            id,
        ),
    )?;

    Ok(transaction)
}

/// Remove the transaction with `id` entirely and return the removed snapshot.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction.
pub fn delete_transaction(id: i64, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = get_transaction(id, connection)?;

    connection.execute("DELETE FROM \"appData\" WHERE id = ?1", [id])?;

    Ok(transaction)
}

/// Set the soft-delete flag on the transaction with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction.
pub fn set_deleted(id: i64, deleted: bool, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "UPDATE \"appData\" SET is_deleted = ?2 WHERE id = ?1
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row((id, deleted), map_transaction_row)?;

    Ok(transaction)
}

/// Set the soft-delete flag on every transaction whose id is in `ids`.
///
/// Returns the number of rows that matched.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn set_deleted_many(
    ids: &[i64],
    deleted: bool,
    connection: &Connection,
) -> Result<usize, Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let mut parameters = vec![Value::Integer(deleted as i64)];
    parameters.extend(ids.iter().map(|id| Value::Integer(*id)));

    let updated = connection.execute(
        &format!("UPDATE \"appData\" SET is_deleted = ?1 WHERE id IN ({placeholders})"),
        params_from_iter(parameters.iter()),
    )?;

    Ok(updated)
}

/// Whether a live (non-deleted) transaction with the same date and normalized
/// description already exists, ignoring the row `exclude_id` if given.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn live_duplicate_exists(
    date: Date,
    description: &str,
    exclude_id: Option<i64>,
    connection: &Connection,
) -> Result<bool, Error> {
    let exists = connection.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM \"appData\"
            WHERE date = ?1 AND description = ?2 AND is_deleted = 0
              AND (?3 IS NULL OR id <> ?3)
         )",
        (date, description, exclude_id),
        |row| row.get(0),
    )?;

    Ok(exists)
}

/// Get one page of transactions filtered by the soft-delete flag, ordered by
/// date descending.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_transactions_paginated(
    is_deleted: bool,
    limit: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"appData\"
             WHERE is_deleted = ?1
             ORDER BY date DESC
             LIMIT {limit} OFFSET {offset}"
        ))?
        .query_map([is_deleted], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Count the transactions matching the soft-delete flag.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn count_transactions(is_deleted: bool, connection: &Connection) -> Result<u64, Error> {
    // SQLite integers are i64; widen after the read.
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM \"appData\" WHERE is_deleted = ?1",
        [is_deleted],
        |row| row.get(0),
    )?;

    Ok(count as u64)
}

/// Collect the dedup keys of all live transactions dated on any of `dates`.
///
/// This is the ingestion pipeline's one batched existence read. The key format
/// is ISO date + `"|"` + stored (normalized) description.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn collect_live_keys(
    dates: &[Date],
    connection: &Connection,
) -> Result<HashSet<String>, Error> {
    let distinct_dates: Vec<Date> = {
        let mut seen = HashSet::new();
        dates
            .iter()
            .copied()
            .filter(|date| seen.insert(*date))
            .collect()
    };

    if distinct_dates.is_empty() {
        return Ok(HashSet::new());
    }

    let placeholders = vec!["?"; distinct_dates.len()].join(",");

    connection
        .prepare(&format!(
            "SELECT date, description FROM \"appData\"
             WHERE is_deleted = 0 AND date IN ({placeholders})"
        ))?
        .query_map(params_from_iter(distinct_dates.iter()), |row| {
            let date: Date = row.get(0)?;
            let description: String = row.get(1)?;
            Ok(format!("{date}|{description}"))
        })?
        .map(|key_result| key_result.map_err(Error::from))
        .collect()
}

/// Insert a batch of validated transactions inside a single SQL transaction.
///
/// Either every row is stored or, on the first failure, the whole batch is
/// rolled back and the error propagates.
///
/// # Errors
/// Returns [Error::SqlError] if any insert or the commit fails.
pub fn insert_batch(
    batch: Vec<NewTransaction>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let tx = connection.unchecked_transaction()?;
    let mut stored = Vec::with_capacity(batch.len());

    {
        let mut statement = tx.prepare(&format!(
            "INSERT INTO \"appData\" (date, description, original_amount, currency, amount_in_inr)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?;

        for new_transaction in batch {
            let transaction = statement.query_row(
                (
                    new_transaction.date,
                    new_transaction.description,
                    new_transaction.original_amount,
                    new_transaction.currency,
                    new_transaction.amount_in_inr,
                ),
                map_transaction_row,
            )?;

            stored.push(transaction);
        }
    }

    tx.commit()?;
    Ok(stored)
}

/// Look up `id` and fail with [Error::NotFound] unless it refers to a live
/// (non-deleted) transaction.
///
/// Mutation routes other than restore treat soft-deleted rows as absent.
pub fn require_live(id: i64, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = get_transaction(id, connection)?;

    if transaction.is_deleted {
        return Err(Error::NotFound);
    }

    Ok(transaction)
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler for the paginated transaction list.
pub async fn get_transactions_endpoint(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, Error> {
    let params = query.resolve()?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let total = count_transactions(params.is_deleted, &connection)?;
    let pages = page_count(total, params.limit);

    if params.page > 1 && params.page > pages {
        return Err(Error::Validation(
            "Invalid page number. Pages cannot be greater than total pages".to_owned(),
        ));
    }

    let transactions = get_transactions_paginated(
        params.is_deleted,
        params.limit,
        params.offset(),
        &connection,
    )?;

    Ok(Json(TransactionPage {
        transactions,
        total,
        page: params.page,
        pages,
    })
    .into_response())
}

/// A route handler for creating a new transaction.
///
/// Rejects the request when a live transaction already exists with the same
/// date and normalized description.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<Response, Error> {
    let new_transaction = payload.validate()?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    if live_duplicate_exists(
        new_transaction.date,
        &new_transaction.description,
        None,
        &connection,
    )? {
        return Err(Error::DuplicateTransaction);
    }

    let transaction = create_transaction(new_transaction, &connection)?;

    tracing::info!("Created transaction {}", transaction.id);

    Ok((StatusCode::CREATED, Json(json!({ "transaction": transaction }))).into_response())
}

/// A route handler for partially updating a transaction.
///
/// Soft-deleted rows are invisible here and respond with 404. The duplicate
/// check excludes the row being updated.
pub async fn update_transaction_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<Response, Error> {
    let changes = payload.validate()?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let existing = require_live(id, &connection)?;

    if changes.date.is_some() || changes.description.is_some() {
        let date = changes.date.unwrap_or(existing.date);
        let description = changes
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone());

        if live_duplicate_exists(date, &description, Some(id), &connection)? {
            return Err(Error::DuplicateTransaction);
        }
    }

    let transaction = update_transaction(id, changes, &connection)?;

    Ok((StatusCode::CREATED, Json(json!({ "transaction": transaction }))).into_response())
}

/// A route handler for hard-deleting a transaction.
///
/// Soft-deleted rows are invisible here and respond with 404.
pub async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    require_live(id, &connection)?;
    let transaction = delete_transaction(id, &connection)?;

    tracing::info!("Deleted transaction {id}");

    Ok(Json(json!({
        "message": "Transaction deleted successfully",
        "transaction": transaction,
    }))
    .into_response())
}

/// A route handler for soft-deleting a transaction.
///
/// Repeat calls are allowed; only an absent id responds with 404.
pub async fn soft_delete_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let transaction = set_deleted(id, true, &connection)?;

    Ok(Json(json!({ "transaction": transaction })).into_response())
}

/// A route handler for restoring a soft-deleted transaction.
pub async fn restore_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let transaction = set_deleted(id, false, &connection)?;

    Ok(Json(json!({ "transaction": transaction })).into_response())
}


#[cfg(test)]
mod store_tests {
    use time::macros::date;

    use crate::{
        Error,
        transaction::{
            TransactionChanges, collect_live_keys, count_transactions, delete_transaction,
            get_transaction, get_transactions_paginated, insert_batch, live_duplicate_exists,
            set_deleted, set_deleted_many,
            test_helpers::{get_test_connection, insert_test_transaction},
            update_transaction,
        },
    };

    use super::NewTransaction;

    #[test]
    fn create_and_get_round_trip() {
        let connection = get_test_connection();

        let created = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );

        let got = get_transaction(created.id, &connection).expect("Could not get transaction");

        assert_eq!(created, got);
        assert_eq!(got.amount_in_inr, 400.0);
        assert!(!got.is_deleted);
    }

    #[test]
    fn get_missing_transaction_is_not_found() {
        let connection = get_test_connection();

        let result = get_transaction(999, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn update_currency_recomputes_inr_amount() {
        let connection = get_test_connection();
        let created = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );

        let updated = update_transaction(
            created.id,
            TransactionChanges {
                currency: Some("EUR".to_owned()),
                ..Default::default()
            },
            &connection,
        )
        .expect("Could not update transaction");

        assert_eq!(updated.currency, "EUR");
        assert_eq!(updated.amount_in_inr, 5.0 * 90.0);
        assert_eq!(updated.original_amount, 5.0);
    }

    #[test]
    fn update_amount_recomputes_inr_amount() {
        let connection = get_test_connection();
        let created = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );

        let updated = update_transaction(
            created.id,
            TransactionChanges {
                original_amount: Some(7.5),
                ..Default::default()
            },
            &connection,
        )
        .expect("Could not update transaction");

        assert_eq!(updated.amount_in_inr, 7.5 * 80.0);

        // The change must also be persisted, not just returned.
        let got = get_transaction(created.id, &connection).unwrap();
        assert_eq!(got, updated);
    }

    #[test]
    fn update_description_alone_keeps_inr_amount() {
        let connection = get_test_connection();
        let created = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );

        let updated = update_transaction(
            created.id,
            TransactionChanges {
                description: Some("Espresso".to_owned()),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.description, "Espresso");
        assert_eq!(updated.amount_in_inr, created.amount_in_inr);
    }

    #[test]
    fn hard_delete_returns_snapshot_and_removes_row() {
        let connection = get_test_connection();
        let created = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );

        let removed =
            delete_transaction(created.id, &connection).expect("Could not delete transaction");

        assert_eq!(removed, created);
        assert_eq!(get_transaction(created.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn soft_delete_and_restore_flip_the_flag() {
        let connection = get_test_connection();
        let created = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );

        let deleted = set_deleted(created.id, true, &connection).unwrap();
        assert!(deleted.is_deleted);

        // Repeat soft-deletes are allowed and harmless.
        let deleted_again = set_deleted(created.id, true, &connection).unwrap();
        assert!(deleted_again.is_deleted);

        let restored = set_deleted(created.id, false, &connection).unwrap();
        assert!(!restored.is_deleted);
    }

    #[test]
    fn set_deleted_missing_row_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(set_deleted(42, true, &connection), Err(Error::NotFound));
    }

    #[test]
    fn set_deleted_many_counts_matches() {
        let connection = get_test_connection();
        let first = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );
        let second = insert_test_transaction(
            date!(2023 - 01 - 02),
            "Tea",
            3.0,
            "USD",
            80.0,
            &connection,
        );

        let updated =
            set_deleted_many(&[first.id, second.id, 999], true, &connection).unwrap();

        assert_eq!(updated, 2);
        assert!(get_transaction(first.id, &connection).unwrap().is_deleted);
        assert!(get_transaction(second.id, &connection).unwrap().is_deleted);
    }

    #[test]
    fn duplicate_check_sees_live_rows_only() {
        let connection = get_test_connection();
        let created = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );

        assert!(
            live_duplicate_exists(date!(2023 - 01 - 01), "Coffee", None, &connection).unwrap()
        );
        assert!(
            !live_duplicate_exists(date!(2023 - 01 - 02), "Coffee", None, &connection).unwrap()
        );

        // Excluding the row itself makes a same-value update safe.
        assert!(
            !live_duplicate_exists(date!(2023 - 01 - 01), "Coffee", Some(created.id), &connection)
                .unwrap()
        );

        set_deleted(created.id, true, &connection).unwrap();
        assert!(
            !live_duplicate_exists(date!(2023 - 01 - 01), "Coffee", None, &connection).unwrap()
        );
    }

    #[test]
    fn pagination_orders_by_date_descending() {
        let connection = get_test_connection();
        for (day, description) in [(1, "a"), (3, "c"), (2, "b")] {
            insert_test_transaction(
                date!(2023 - 01 - 01).replace_day(day).unwrap(),
                description,
                1.0,
                "INR",
                1.0,
                &connection,
            );
        }

        let page = get_transactions_paginated(false, 2, 0, &connection).unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page[0].description, "c");
        assert_eq!(page[1].description, "b");

        let second_page = get_transactions_paginated(false, 2, 2, &connection).unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].description, "a");
    }

    #[test]
    fn count_respects_the_deleted_flag() {
        let connection = get_test_connection();
        let created = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );
        insert_test_transaction(date!(2023 - 01 - 02), "Tea", 3.0, "USD", 80.0, &connection);
        set_deleted(created.id, true, &connection).unwrap();

        assert_eq!(count_transactions(false, &connection).unwrap(), 1);
        assert_eq!(count_transactions(true, &connection).unwrap(), 1);
    }

    #[test]
    fn collect_live_keys_skips_deleted_rows() {
        let connection = get_test_connection();
        let live = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );
        let deleted = insert_test_transaction(
            date!(2023 - 01 - 01),
            "Tea",
            3.0,
            "USD",
            80.0,
            &connection,
        );
        set_deleted(deleted.id, true, &connection).unwrap();

        let keys = collect_live_keys(
            &[date!(2023 - 01 - 01), date!(2023 - 01 - 01)],
            &connection,
        )
        .unwrap();

        assert!(keys.contains(&format!("{}|Coffee", live.date)));
        assert!(!keys.contains(&format!("{}|Tea", live.date)));
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn collect_live_keys_with_no_dates_is_empty() {
        let connection = get_test_connection();

        assert!(collect_live_keys(&[], &connection).unwrap().is_empty());
    }

    #[test]
    fn insert_batch_stores_every_row() {
        let connection = get_test_connection();
        let batch = vec![
            NewTransaction {
                date: date!(2023 - 01 - 01),
                description: "Coffee".to_owned(),
                original_amount: 5.0,
                currency: "USD".to_owned(),
                amount_in_inr: 400.0,
            },
            NewTransaction {
                date: date!(2023 - 01 - 02),
                description: "Tea".to_owned(),
                original_amount: 3.0,
                currency: "USD".to_owned(),
                amount_in_inr: 240.0,
            },
        ];

        let stored = insert_batch(batch, &connection).expect("Could not insert batch");

        assert_eq!(stored.len(), 2);
        assert_eq!(count_transactions(false, &connection).unwrap(), 2);
    }
}
