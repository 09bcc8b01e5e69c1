//! Parsing policy for stored message timestamps.
//!
//! Accepted shapes:
//! - ISO-8601 with a `T` separator, optionally with fractional seconds, a `Z`
//!   suffix or a numeric offset (`2024-05-01T10:15:00.123Z`,
//!   `2024-05-01T10:15:00+02:00`, `2024-05-01T10:15:00`)
//! - the storage form `YYYY-MM-DD HH:MM:SS`
//!
//! Values without an offset are read as UTC.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Format used when writing timestamps to storage.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ISO_NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const ISO_OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%z"];

/// A timestamp that does not match any accepted shape.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unparsable timestamp {input:?}: {source}")]
pub struct TimestampError {
    /// The rejected input.
    pub input: String,
    /// Underlying chrono error.
    #[source]
    pub source: chrono::ParseError,
}

/// Parse a stored timestamp into UTC.
///
/// # Errors
/// Returns [`TimestampError`] when the input matches no accepted shape.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = raw.trim();
    let fail = |source| TimestampError {
        input: raw.to_string(),
        source,
    };

    if !trimmed.contains('T') {
        return NaiveDateTime::parse_from_str(trimmed, STORAGE_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(fail);
    }

    let without_zulu = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix('z'))
        .unwrap_or(trimmed);
    let cleaned = strip_fraction(without_zulu);

    for format in ISO_OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&cleaned, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }

    NaiveDateTime::parse_from_str(&cleaned, ISO_NAIVE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(fail)
}

/// Render a timestamp in the storage form.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(STORAGE_FORMAT).to_string()
}

/// Drop a `.ddd` fractional-seconds component, keeping any trailing offset.
fn strip_fraction(value: &str) -> Cow<'_, str> {
    let Some(dot) = value.find('.') else {
        return Cow::Borrowed(value);
    };
    let rest = &value[dot + 1..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    Cow::Owned(format!("{}{}", &value[..dot], &rest[digits..]))
}
