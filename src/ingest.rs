//! Bulk CSV ingestion.
//!
//! Implements the upload endpoint: a multipart CSV file is parsed, each row is
//! validated and normalized, rows that fail any check are skipped with a
//! human-readable warning, and the surviving rows are written in a single SQL
//! transaction so a batch is stored either completely or not at all.

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    normalize::{date_in_bounds, normalize_description, parse_ingest_date},
    rates::{canonical_currency, conversion_rate},
    transaction::{NewTransaction, Transaction, collect_live_keys, insert_batch},
};

/// The maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

const BAD_FILE_MESSAGE: &str = "Only .csv files are allowed and must be less than 1MB!";

/// One raw CSV row, exactly as read from the file.
#[derive(Debug, Clone, PartialEq)]
struct RawRow {
    date: String,
    description: String,
    amount: String,
    currency: String,
}

impl RawRow {
    /// Render the row for warning messages.
    ///
    /// The key order is fixed and the amount is emitted as a JSON number when
    /// it parses as one, so warnings read like the row the client uploaded.
    fn to_json(&self) -> String {
        // "inf"/"nan" parse as f64 but are not JSON numbers.
        let amount = if self.amount.parse::<f64>().is_ok_and(f64::is_finite) {
            self.amount.clone()
        } else {
            escape_json(&self.amount)
        };

        format!(
            "{{\"Date\":{},\"Description\":{},\"Amount\":{},\"Currency\":{}}}",
            escape_json(&self.date),
            escape_json(&self.description),
            amount,
            escape_json(&self.currency),
        )
    }
}

fn escape_json(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_owned())
}

/// The result of ingesting one CSV file.
#[derive(Debug)]
pub struct IngestOutcome {
    /// The transactions that were stored, in file order.
    pub stored: Vec<Transaction>,
    /// One warning per skipped row, in file order.
    pub warnings: Vec<String>,
}

/// Parse CSV text into raw rows using the `Date`, `Description`, `Amount`,
/// and `Currency` columns. Missing columns read as empty strings and rows
/// where every cell is empty are dropped.
///
/// # Errors
/// Returns [Error::InvalidCsv] when the file is unreadable as CSV or contains
/// no data rows.
fn parse_rows(text: &str) -> Result<Vec<RawRow>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?
        .clone();

    let column = |name: &str| headers.iter().position(|header| header == name);
    let date_column = column("Date");
    let description_column = column("Description");
    let amount_column = column("Amount");
    let currency_column = column("Currency");

    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|error| Error::InvalidCsv(error.to_string()))?;

        let cell = |index: Option<usize>| {
            index
                .and_then(|index| record.get(index))
                .unwrap_or_default()
                .to_owned()
        };

        let row = RawRow {
            date: cell(date_column),
            description: cell(description_column),
            amount: cell(amount_column),
            currency: cell(currency_column),
        };

        if row.date.is_empty()
            && row.description.is_empty()
            && row.amount.is_empty()
            && row.currency.is_empty()
        {
            continue;
        }

        rows.push(row);
    }

    if rows.is_empty() {
        return Err(Error::InvalidCsv("CSV file is empty".to_owned()));
    }

    Ok(rows)
}

/// Validate and store the rows of a CSV file.
///
/// Duplicate detection uses one batched read of the live rows sharing a date
/// with any candidate row, then checks each candidate against those keys and
/// against the earlier rows of the same file. All surviving rows are written
/// in a single SQL transaction.
///
/// # Errors
/// Returns [Error::InvalidCsv] for an empty or unreadable file and
/// [Error::SqlError] if the batched read or the write fails. Row-level
/// problems never fail the call; they become warnings.
pub fn ingest_csv(text: &str, connection: &Connection) -> Result<IngestOutcome, Error> {
    let rows = parse_rows(text)?;

    let candidate_dates: Vec<_> = rows
        .iter()
        .filter_map(|row| parse_ingest_date(&row.date))
        .collect();
    let existing_keys = collect_live_keys(&candidate_dates, connection)?;

    let mut seen_keys = HashSet::new();
    let mut warnings = Vec::new();
    let mut batch = Vec::new();

    for row in &rows {
        let description = normalize_description(&row.description);
        let amount = row.amount.parse::<f64>().ok();

        let well_formed = !row.date.is_empty()
            && !description.is_empty()
            && !row.currency.is_empty()
            && amount.is_some_and(|amount| amount > 0.0 && amount.is_finite());

        let Some(amount) = amount.filter(|_| well_formed) else {
            warnings.push(format!("Invalid record: {}", row.to_json()));
            continue;
        };

        let currency = canonical_currency(&row.currency);
        let Some(rate) = conversion_rate(&currency) else {
            warnings.push(format!("Invalid currency code: {}", row.currency.trim()));
            continue;
        };

        let Some(date) = parse_ingest_date(&row.date) else {
            warnings.push(format!("Invalid date format: {}", row.date.trim()));
            continue;
        };

        if !date_in_bounds(date) {
            warnings.push(format!("Invalid date: {}", row.date.trim()));
            continue;
        }

        let key = format!("{date}|{description}");

        if existing_keys.contains(&key) || !seen_keys.insert(key) {
            warnings.push(format!("Duplicate transaction: {}", row.to_json()));
            continue;
        }

        batch.push(NewTransaction {
            date,
            description,
            original_amount: amount,
            currency,
            amount_in_inr: amount * rate,
        });
    }

    let stored = insert_batch(batch, connection)?;

    Ok(IngestOutcome { stored, warnings })
}

/// Pull the CSV text out of the multipart body.
///
/// The file part must declare `text/csv`, carry a `.csv` filename, and fit in
/// [MAX_UPLOAD_BYTES].
async fn read_csv_field(multipart: &mut Multipart) -> Result<String, Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::Multipart(error.to_string()))?
    {
        let Some(file_name) = field.file_name().map(ToOwned::to_owned) else {
            continue;
        };

        let is_csv = field.content_type() == Some("text/csv")
            && file_name.to_lowercase().ends_with(".csv");
        if !is_csv {
            return Err(Error::InvalidFile(BAD_FILE_MESSAGE.to_owned()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|error| Error::Multipart(error.to_string()))?;

        if data.len() > MAX_UPLOAD_BYTES {
            return Err(Error::InvalidFile(BAD_FILE_MESSAGE.to_owned()));
        }

        return String::from_utf8(data.to_vec())
            .map_err(|_| Error::InvalidFile("File must be UTF-8 encoded text".to_owned()));
    }

    Err(Error::InvalidFile("No file uploaded".to_owned()))
}

/// A route handler for uploading a CSV file of transactions.
///
/// Responds with 201 and a body listing the stored count alongside one
/// warning per skipped row.
pub async fn upload_csv_endpoint(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, Error> {
    let text = read_csv_field(&mut multipart).await?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let outcome = ingest_csv(&text, &connection)?;

    tracing::info!(
        "Ingested CSV: {} stored, {} skipped",
        outcome.stored.len(),
        outcome.warnings.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "storedCount": outcome.stored.len(),
            "warnings": outcome.warnings,
        })),
    )
        .into_response())
}
