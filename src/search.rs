//! Searching transactions by field filters.
//!
//! Filters combine with AND, the description filter matches substrings, and
//! results come back paginated in the same shape as the plain list route.
//! Search sees live rows unless `isDeleted=true` asks for the soft-deleted
//! ones.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    normalize::parse_api_date,
    pagination::{PageParams, PageQuery, page_count},
    rates::{canonical_currency, conversion_rate},
    transaction::{Transaction, TransactionPage, map_transaction_row},
};

/// The raw search query parameters.
///
/// Pagination fields are repeated here instead of flattening [PageQuery]
/// because the query-string deserializer cannot handle `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Substring to look for in descriptions.
    pub description: Option<String>,
    /// Exact original amount to match.
    pub amount: Option<String>,
    /// Exact date to match, as a strict `YYYY-MM-DD` string.
    pub date: Option<String>,
    /// Currency code to match.
    pub currency: Option<String>,
    /// Whether to search soft-deleted rows instead of live ones. Not counted
    /// as a search filter.
    #[serde(rename = "isDeleted")]
    pub is_deleted: Option<String>,
    /// The 1-based page number.
    pub page: Option<String>,
    /// The page size.
    pub limit: Option<String>,
}

/// A validated set of search filters. At least one field is present.
#[derive(Debug, PartialEq)]
struct SearchFilters {
    description: Option<String>,
    amount: Option<f64>,
    date: Option<Date>,
    currency: Option<String>,
}

impl SearchQuery {
    fn validate(&self) -> Result<(SearchFilters, PageParams), Error> {
        if self.description.is_none()
            && self.amount.is_none()
            && self.date.is_none()
            && self.currency.is_none()
        {
            return Err(Error::Validation(
                "Please provide at least one search filter".to_owned(),
            ));
        }

        let amount = self
            .amount
            .as_deref()
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|_| Error::Validation("Please provide a valid amount".to_owned()))
            })
            .transpose()?;

        let date = self
            .date
            .as_deref()
            .map(|raw| {
                parse_api_date(raw)
                    .ok_or_else(|| Error::Validation("Please provide a valid date".to_owned()))
            })
            .transpose()?;

        let currency = match self.currency.as_deref() {
            None => None,
            Some(raw) => {
                let currency = canonical_currency(raw);
                if conversion_rate(&currency).is_none() {
                    return Err(Error::InvalidCurrency(currency));
                }
                Some(currency)
            }
        };

        let params = PageQuery {
            page: self.page.clone(),
            limit: self.limit.clone(),
            is_deleted: self.is_deleted.clone(),
        }
        .resolve()?;

        Ok((
            SearchFilters {
                description: self.description.clone(),
                amount,
                date,
                currency,
            },
            params,
        ))
    }
}

/// Build the WHERE clause and its bound parameters for `filters`.
fn build_where(filters: &SearchFilters, is_deleted: bool) -> (String, Vec<Value>) {
    let mut parameters = vec![Value::Integer(is_deleted as i64)];
    let mut clauses = vec!["is_deleted = ?1".to_owned()];

    if let Some(description) = &filters.description {
        parameters.push(Value::Text(format!("%{description}%")));
        clauses.push(format!("description LIKE ?{}", parameters.len()));
    }

    if let Some(amount) = filters.amount {
        parameters.push(Value::Real(amount));
        clauses.push(format!("original_amount = ?{}", parameters.len()));
    }

    if let Some(date) = filters.date {
        parameters.push(Value::Text(date.to_string()));
        clauses.push(format!("date = ?{}", parameters.len()));
    }

    if let Some(currency) = &filters.currency {
        parameters.push(Value::Text(currency.clone()));
        clauses.push(format!("currency = ?{}", parameters.len()));
    }

    (clauses.join(" AND "), parameters)
}

fn search_transactions(
    filters: &SearchFilters,
    params: PageParams,
    connection: &Connection,
) -> Result<(Vec<Transaction>, u64), Error> {
    let (where_clause, parameters) = build_where(filters, params.is_deleted);

    let total: i64 = connection.query_row(
        &format!("SELECT COUNT(id) FROM \"appData\" WHERE {where_clause}"),
        params_from_iter(parameters.iter()),
        |row| row.get(0),
    )?;
    let total = total as u64;

    let transactions = connection
        .prepare(&format!(
            "SELECT id, date, description, original_amount, currency, amount_in_inr, is_deleted
             FROM \"appData\"
             WHERE {where_clause}
             ORDER BY date DESC
             LIMIT {} OFFSET {}",
            params.limit,
            params.offset(),
        ))?
        .query_map(params_from_iter(parameters.iter()), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((transactions, total))
}

/// A route handler for searching transactions.
pub async fn search_endpoint(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, Error> {
    let (filters, params) = query.validate()?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let (transactions, total) = search_transactions(&filters, params, &connection)?;
    let pages = page_count(total, params.limit);

    Ok(Json(TransactionPage {
        transactions,
        total,
        page: params.page,
        pages,
    })
    .into_response())
}

#[cfg(test)]
mod search_tests {
    use time::macros::date;

    use crate::{
        Error,
        pagination::PageParams,
        search::{SearchFilters, SearchQuery, search_transactions},
        transaction::{
            set_deleted,
            test_helpers::{get_test_connection, insert_test_transaction},
        },
    };

    fn default_params() -> PageParams {
        PageParams {
            page: 1,
            limit: 10,
            is_deleted: false,
        }
    }

    fn no_filters() -> SearchFilters {
        SearchFilters {
            description: None,
            amount: None,
            date: None,
            currency: None,
        }
    }

    #[test]
    fn empty_query_requires_a_filter() {
        let result = SearchQuery::default().validate();

        assert_eq!(
            result.unwrap_err(),
            Error::Validation("Please provide at least one search filter".to_owned())
        );
    }

    #[test]
    fn pagination_only_is_not_a_filter() {
        let query = SearchQuery {
            page: Some("2".to_owned()),
            limit: Some("5".to_owned()),
            ..Default::default()
        };

        assert!(query.validate().is_err());
    }

    #[test]
    fn invalid_amount_date_and_currency_are_rejected() {
        let bad_amount = SearchQuery {
            amount: Some("five".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            bad_amount.validate().unwrap_err(),
            Error::Validation("Please provide a valid amount".to_owned())
        );

        let bad_date = SearchQuery {
            date: Some("01-05-2023".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            bad_date.validate().unwrap_err(),
            Error::Validation("Please provide a valid date".to_owned())
        );

        let bad_currency = SearchQuery {
            currency: Some("XYZ".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            bad_currency.validate().unwrap_err(),
            Error::InvalidCurrency("XYZ".to_owned())
        );
    }

    #[test]
    fn description_matches_substrings() {
        let connection = get_test_connection();
        insert_test_transaction(
            date!(2023 - 05 - 01),
            "Morning coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );
        insert_test_transaction(date!(2023 - 05 - 02), "Tea", 3.0, "USD", 80.0, &connection);

        let filters = SearchFilters {
            description: Some("coffee".to_owned()),
            ..no_filters()
        };

        let (transactions, total) =
            search_transactions(&filters, default_params(), &connection).unwrap();

        assert_eq!(total, 1);
        assert_eq!(transactions[0].description, "Morning coffee");
    }

    #[test]
    fn filters_combine_with_and() {
        let connection = get_test_connection();
        insert_test_transaction(
            date!(2023 - 05 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );
        insert_test_transaction(
            date!(2023 - 05 - 01),
            "Coffee beans",
            5.0,
            "EUR",
            90.0,
            &connection,
        );

        let filters = SearchFilters {
            description: Some("Coffee".to_owned()),
            amount: Some(5.0),
            date: Some(date!(2023 - 05 - 01)),
            currency: Some("EUR".to_owned()),
            ..no_filters()
        };

        let (transactions, total) =
            search_transactions(&filters, default_params(), &connection).unwrap();

        assert_eq!(total, 1);
        assert_eq!(transactions[0].currency, "EUR");
    }

    #[test]
    fn soft_deleted_rows_are_invisible_by_default() {
        let connection = get_test_connection();
        let transaction = insert_test_transaction(
            date!(2023 - 05 - 01),
            "Coffee",
            5.0,
            "USD",
            80.0,
            &connection,
        );
        set_deleted(transaction.id, true, &connection).unwrap();

        let filters = SearchFilters {
            description: Some("Coffee".to_owned()),
            ..no_filters()
        };

        let (transactions, total) =
            search_transactions(&filters, default_params(), &connection).unwrap();

        assert_eq!(total, 0);
        assert!(transactions.is_empty());

        // Asking for the deleted side finds the row.
        let deleted_params = PageParams {
            is_deleted: true,
            ..default_params()
        };
        let (transactions, total) =
            search_transactions(&filters, deleted_params, &connection).unwrap();

        assert_eq!(total, 1);
        assert!(transactions[0].is_deleted);
    }

    #[test]
    fn results_are_paginated_newest_first() {
        let connection = get_test_connection();
        for day in 1..=5 {
            insert_test_transaction(
                date!(2023 - 05 - 01).replace_day(day).unwrap(),
                "Coffee",
                5.0,
                "USD",
                80.0,
                &connection,
            );
        }

        let filters = SearchFilters {
            description: Some("Coffee".to_owned()),
            ..no_filters()
        };
        let params = PageParams {
            page: 2,
            limit: 2,
            is_deleted: false,
        };

        let (transactions, total) = search_transactions(&filters, params, &connection).unwrap();

        assert_eq!(total, 5);
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].date, date!(2023 - 05 - 03));
        assert_eq!(transactions[1].date, date!(2023 - 05 - 02));
    }
}
