//! Yearly summary report over a range of calendar years.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{AppState, Error};

/// The raw report query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// The first calendar year of the range, inclusive.
    #[serde(rename = "startYear")]
    pub start_year: Option<String>,
    /// The last calendar year of the range, inclusive.
    #[serde(rename = "endYear")]
    pub end_year: Option<String>,
}

impl ReportQuery {
    /// Validate the year range into inclusive date bounds.
    fn validate(&self) -> Result<(Date, Date), Error> {
        let (Some(start_year), Some(end_year)) =
            (self.start_year.as_deref(), self.end_year.as_deref())
        else {
            return Err(Error::Validation(
                "Please provide both startYear and endYear".to_owned(),
            ));
        };

        let parse_year = |raw: &str| {
            raw.parse::<i32>()
                .map_err(|_| Error::Validation("startYear and endYear must be valid years".to_owned()))
        };
        let start_year = parse_year(start_year)?;
        let end_year = parse_year(end_year)?;

        if start_year > end_year {
            return Err(Error::Validation(
                "startYear cannot be greater than endYear".to_owned(),
            ));
        }

        let invalid_year =
            |_| Error::Validation("startYear and endYear must be valid years".to_owned());
        let start = Date::from_calendar_date(start_year, Month::January, 1).map_err(invalid_year)?;
        let end = Date::from_calendar_date(end_year, Month::December, 31).map_err(invalid_year)?;

        Ok((start, end))
    }
}

/// A summary of the transactions dated within a year range.
///
/// Aggregates use original amounts, so the totals mix currencies; the
/// per-currency breakdown is what makes them interpretable.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// The number of transactions in the range.
    pub total_transactions: u64,
    /// The sum of the original amounts.
    pub total_amount: f64,
    /// The mean original amount.
    pub average_amount: f64,
    /// Sums of the original amounts keyed by currency code.
    pub currency_breakdown: BTreeMap<String, f64>,
}

/// Summarize all transactions, deleted or not, dated between `start` and
/// `end` inclusive.
///
/// # Errors
/// Returns [Error::NotFound] when no transactions fall in the range, or
/// [Error::SqlError] on SQL errors.
fn build_report(start: Date, end: Date, connection: &Connection) -> Result<Report, Error> {
    let rows: Vec<(f64, String)> = connection
        .prepare(
            "SELECT original_amount, currency FROM \"appData\"
             WHERE date BETWEEN ?1 AND ?2",
        )?
        .query_map((start, end), |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    if rows.is_empty() {
        return Err(Error::NotFound);
    }

    let total_transactions = rows.len() as u64;
    let total_amount: f64 = rows.iter().map(|(amount, _)| amount).sum();

    let mut currency_breakdown = BTreeMap::new();
    for (amount, currency) in rows {
        *currency_breakdown.entry(currency).or_insert(0.0) += amount;
    }

    Ok(Report {
        total_transactions,
        total_amount,
        average_amount: total_amount / total_transactions as f64,
        currency_breakdown,
    })
}

/// A route handler for the yearly report.
pub async fn report_endpoint(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let (start, end) = query.validate()?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let report = build_report(start, end, &connection)?;

    Ok(Json(report).into_response())
}
