//! HTTP date parsing and formatting
//!
//! Accepted forms, most preferred first:
//! 1. IMF-fixdate: `Sun, 06 Nov 1994 08:49:37 GMT`
//! 2. RFC 850: `Sunday, 06-Nov-94 08:49:37 GMT`
//! 3. asctime: `Sun Nov  6 08:49:37 1994`
//! 4. RFC 2822 (with numeric zone) as a lenient fallback

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC_850: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ASCTIME: &str = "%a %b %e %H:%M:%S %Y";

/// Parse an HTTP date into a UTC timestamp
pub fn parse(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    for format in [IMF_FIXDATE, RFC_850, ASCTIME] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    DateTime::parse_from_rfc2822(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| Error::Parse(format!("unrecognized HTTP date: {:?}", value)))
}

/// Format a timestamp as IMF-fixdate
pub fn format(date: DateTime<Utc>) -> String {
    date.format(IMF_FIXDATE).to_string()
}
