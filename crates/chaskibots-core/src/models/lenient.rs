//! Forgiving deserializers for cells edited by hand in Airtable.
//!
//! A single malformed cell must not make a whole table unreadable, so
//! these fall back to `None` instead of failing the record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{DeserializeOwned, Deserializer, IgnoredAny};
use serde::Deserialize;
use tracing::warn;

#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Text(String),
    Other(IgnoredAny),
}

/// Accepts RFC 3339 timestamps and date-only values (`2024-03-01`,
/// read as midnight UTC). Anything else becomes `None`.
pub fn datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Option::<Cell>::deserialize(deserializer)? {
        Some(Cell::Text(text)) => text,
        _ => return Ok(None),
    };
    Ok(parse_datetime(text.trim()))
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Some(dt.and_utc());
    }
    warn!(value = text, "Ignoring unparseable date");
    None
}

/// Single-select cells: a value outside the known options becomes `None`.
pub fn select<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match T::deserialize(&value) {
        Ok(known) => Some(known),
        Err(e) => {
            warn!(value = %value, error = %e, "Ignoring unknown select option");
            None
        }
    }))
}
