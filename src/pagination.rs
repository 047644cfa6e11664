//! Validation for the page/limit/isDeleted query parameters shared by the
//! list and search routes.

use serde::Deserialize;

use crate::Error;

/// The largest page size a client may request.
pub const MAX_PAGE_SIZE: u64 = 1000;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_PAGE_SIZE: u64 = 10;

/// The raw, unvalidated pagination query parameters.
///
/// Values are kept as strings so that malformed input produces a clean 400
/// with a message instead of an extractor rejection.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    /// The 1-based page number, defaults to 1.
    pub page: Option<String>,
    /// The page size, defaults to 10.
    pub limit: Option<String>,
    /// Whether to list soft-deleted rows instead of live ones, defaults to false.
    #[serde(rename = "isDeleted")]
    pub is_deleted: Option<String>,
}

/// Validated pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    /// The 1-based page number.
    pub page: u64,
    /// The page size.
    pub limit: u64,
    /// The soft-delete filter.
    pub is_deleted: bool,
}

impl PageParams {
    /// The number of rows to skip for this page.
    ///
    /// Saturates instead of overflowing, capped to what SQLite can take as an
    /// integer literal; absurdly large pages land past the end of the table
    /// and read as empty.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

impl PageQuery {
    /// Validate the raw parameters, applying defaults for absent ones.
    ///
    /// # Errors
    /// Returns [Error::Validation] when `page` or `limit` is non-numeric or
    /// below 1, when `limit` exceeds [MAX_PAGE_SIZE], or when `isDeleted` is
    /// neither `true` nor `false`.
    pub fn resolve(&self) -> Result<PageParams, Error> {
        let page = parse_positive(self.page.as_deref(), DEFAULT_PAGE)?;
        let limit = parse_positive(self.limit.as_deref(), DEFAULT_PAGE_SIZE)?;

        if limit > MAX_PAGE_SIZE {
            return Err(Error::Validation(
                "Limit should be less than 1000".to_owned(),
            ));
        }

        let is_deleted = match self.is_deleted.as_deref() {
            None => false,
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(Error::Validation(format!("Invalid isDeleted value: {other}")));
            }
        };

        Ok(PageParams {
            page,
            limit,
            is_deleted,
        })
    }
}

fn parse_positive(raw: Option<&str>, default: u64) -> Result<u64, Error> {
    match raw {
        None => Ok(default),
        Some(text) => match text.parse::<u64>() {
            Ok(value) if value >= 1 => Ok(value),
            _ => Err(Error::Validation("Invalid page or limit".to_owned())),
        },
    }
}

/// The total number of pages needed to hold `total` rows at `limit` per page.
pub fn page_count(total: u64, limit: u64) -> u64 {
    total.div_ceil(limit)
}
