//! The static table of currency conversion rates into INR.
//!
//! The table is fixed at compile time and never mutated at runtime. Unknown
//! codes return `None` and callers must treat that as a hard validation
//! failure rather than falling back to a default rate.

/// Conversion multipliers from a currency's denomination into INR.
const CONVERSION_RATES: &[(&str, f64)] = &[
    ("INR", 1.0),
    ("USD", 80.0),
    ("EUR", 90.0),
    ("GBP", 101.0),
    ("JPY", 0.6),
    ("AUD", 55.0),
    ("CAD", 60.0),
    ("SGD", 61.0),
    ("CHF", 92.0),
    ("NZD", 50.0),
];

/// Look up the conversion rate into INR for a canonicalized currency code.
///
/// The code must already be canonicalized with [canonical_currency].
pub fn conversion_rate(code: &str) -> Option<f64> {
    CONVERSION_RATES
        .iter()
        .find(|(known_code, _)| *known_code == code)
        .map(|(_, rate)| *rate)
}

/// Uppercase a raw currency code so it can be compared against the rate table.
///
/// Membership in the rate table is not checked here, that is the job of
/// [conversion_rate].
pub fn canonical_currency(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod rates_tests {
    use crate::rates::{canonical_currency, conversion_rate};

    #[test]
    fn known_code_has_rate() {
        assert_eq!(conversion_rate("USD"), Some(80.0));
        assert_eq!(conversion_rate("INR"), Some(1.0));
    }

    #[test]
    fn unknown_code_has_no_rate() {
        assert_eq!(conversion_rate("XYZ"), None);
        assert_eq!(conversion_rate(""), None);
    }

    #[test]
    fn lowercase_code_has_no_rate() {
        // Lookup is exact, canonicalization is the caller's responsibility.
        assert_eq!(conversion_rate("usd"), None);
    }

    #[test]
    fn canonicalization_uppercases_and_trims() {
        assert_eq!(canonical_currency(" usd "), "USD");
        assert_eq!(canonical_currency("Eur"), "EUR");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for raw in ["usd", " gbp", "JPY", "xyz"] {
            let once = canonical_currency(raw);
            assert_eq!(canonical_currency(&once), once);
        }
    }
}
