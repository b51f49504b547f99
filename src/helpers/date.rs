//! Date helper functions

use chrono::NaiveDate;

/// Format of `creation_date` in post front-matter
pub const POST_DATE_FORMAT: &str = "%d/%m/%Y";

/// Parse a `DD/MM/YYYY` post date
///
/// Single-digit days and months are accepted. Returns `None` for anything
/// else, including impossible dates like `31/02/2024`.
///
/// # Examples
/// ```ignore
/// parse_post_date("03/01/2024") // -> Some(2024-01-03)
/// ```
pub fn parse_post_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), POST_DATE_FORMAT).ok()
}

/// Reverse the slash-separated parts of a date for display
///
/// # Examples
/// ```ignore
/// display_date("03/01/2024") // -> "2024/01/03"
/// ```
pub fn display_date(s: &str) -> String {
    s.split('/').rev().collect::<Vec<_>>().join("/")
}
