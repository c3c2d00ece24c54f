//! Date helpers for Ratebook.

use chrono::{NaiveDate, Utc};

/// Today's calendar date in UTC, the default date of a new rate.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
}
