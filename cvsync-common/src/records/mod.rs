//! Session and speaker record schemas
//!
//! Records arrive as loosely-typed JSON objects whose keys use camelCase, while
//! the Rust fields use snake_case. Both directions go through
//! `#[serde(rename_all = "camelCase")]`, so files on disk use the same keys as
//! incoming payloads; [`camel_case`] names the same mapping for code that looks
//! fields up by hand.
//!
//! Records are immutable once built. Fields are private and only exposed through
//! accessors; a change means parsing a new record.

mod session;
mod speaker;

pub use session::SessionData;
pub use speaker::SpeakerData;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Convert an internal snake_case field name to the external camelCase name
///
/// The first segment is lower-cased, later segments are capitalized (first
/// letter upper, rest lower) and everything is concatenated.
pub fn camel_case(name: &str) -> String {
    let mut segments = name.split('_');
    let mut out = segments.next().unwrap_or_default().to_lowercase();
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Deserialize a payload object, reporting failures under the external field name
pub(crate) fn decode<T: DeserializeOwned>(payload: &Map<String, Value>) -> Result<T> {
    serde_path_to_error::deserialize(Value::Object(payload.clone())).map_err(|err| {
        let field = err.path().to_string();
        let message = err.into_inner().to_string();
        if let Some(missing) = missing_field(&message) {
            Error::validation(missing, "field required")
        } else if message.starts_with("invalid type: null") {
            Error::validation(field, "field required")
        } else {
            Error::validation(field, message)
        }
    })
}

/// Field name out of serde's "missing field `name`" message
fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")?
        .split('`')
        .next()
}

/// Stubs name files on disk, so each must be one plain path segment
pub(crate) fn check_stub(name: &str, stub: &str) -> Result<()> {
    let reason = if stub.is_empty() {
        "must not be empty"
    } else if stub == "." || stub == ".." {
        "must not be a relative path component"
    } else if stub.contains(['/', '\\', '\0']) {
        "must not contain path separators or NUL"
    } else {
        return Ok(());
    };
    Err(Error::validation(camel_case(name), format!("{reason}, got {stub:?}")))
}

/// Optional list; absent (via `#[serde(default)]`) or null means empty
pub(crate) fn nullable_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn date_time<'de, D>(deserializer: D) -> std::result::Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_date_time(&text).ok_or_else(|| D::Error::custom(format!("invalid date-time {text:?}")))
}

pub(crate) fn date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map_err(|e| D::Error::custom(format!("invalid date {text:?}: {e}")))
}

const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO 8601 date-time
///
/// Accepts `T` or a space between date and time, optional seconds and
/// fraction, and an offset as `Z`, `+hh:mm` or `+hhmm`. A value without an
/// offset is taken as UTC.
fn parse_date_time(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed);
    }

    let mut normalized = text.trim().to_owned();
    if normalized.as_bytes().get(10) == Some(&b' ') {
        normalized.replace_range(10..11, "T");
    }
    if let Some(stripped) = normalized.strip_suffix(['Z', 'z']) {
        normalized = format!("{stripped}+00:00");
    }

    ZONED_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&normalized, format).ok())
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
                .map(|naive| naive.and_utc().fixed_offset())
        })
}
