//! Pure helpers that normalize transaction fields before validation and storage.

use time::{
    Date, OffsetDateTime,
    format_description::BorrowedFormatItem,
    macros::{date, format_description},
};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// The earliest date a transaction may carry.
pub const EARLIEST_DATE: Date = date!(1990 - 01 - 01);

/// Descriptions longer than this are truncated before storage.
const MAX_DESCRIPTION_CHARS: usize = 500;

const API_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const INGEST_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[day]-[month]-[year]");

/// Parse a date in the strict `YYYY-MM-DD` format used by the JSON API.
///
/// Returns `None` for malformed separators, non-numeric parts, and
/// calendar-invalid dates so callers can treat failure as a skip condition.
pub fn parse_api_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), API_DATE_FORMAT).ok()
}

/// Parse a date in the strict `DD-MM-YYYY` format used by CSV ingestion.
pub fn parse_ingest_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), INGEST_DATE_FORMAT).ok()
}

/// Whether `date` lies within the accepted range `[1990-01-01, today]`.
pub fn date_in_bounds(date: Date) -> bool {
    date >= EARLIEST_DATE && date <= OffsetDateTime::now_utc().date()
}

/// Normalize a free-text description for storage and dedup comparison.
///
/// Trims, strips diacritics via NFKD decomposition, drops characters that are
/// not alphanumeric, underscore, hyphen, or whitespace, collapses whitespace
/// runs to single spaces, and truncates to the storage limit. Two descriptions
/// that differ only by whitespace, diacritics, or punctuation normalize
/// identically.
pub fn normalize_description(raw: &str) -> String {
    let stripped: String = raw
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    collapsed.chars().take(MAX_DESCRIPTION_CHARS).collect()
}


#[cfg(test)]
mod description_tests {
    use crate::normalize::normalize_description;

    #[test]
    fn trims_and_collapses_whitespace() {
        assert_eq!(normalize_description("  Coffee   at\tcorner  "), "Coffee at corner");
    }

    #[test]
    fn strips_diacritics() {
        assert_eq!(normalize_description("Café crème"), "Cafe creme");
    }

    #[test]
    fn strips_punctuation_but_keeps_hyphens_and_underscores() {
        assert_eq!(normalize_description("Taxi (airport) - trip_1!"), "Taxi airport - trip_1");
    }

    #[test]
    fn variants_normalize_identically() {
        let base = normalize_description("Cafe creme");
        assert_eq!(normalize_description("Café  crème!"), base);
        assert_eq!(normalize_description("  Cafe\tcreme. "), base);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["  Café  crème! ", "plain", "a - b_c", "  "] {
            let once = normalize_description(raw);
            assert_eq!(normalize_description(&once), once);
        }
    }

    #[test]
    fn truncates_to_storage_limit() {
        let long = "x".repeat(600);
        assert_eq!(normalize_description(&long).chars().count(), 500);
    }
}
