//! Shared CLI utilities.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    bail!("Invalid date '{value}': expected RFC 3339 or YYYY-MM-DD")
}

/// Parse every `--as-of` value; blank entries from stray commas are skipped.
pub fn parse_instants(values: &[String]) -> Result<Vec<DateTime<Utc>>> {
    let mut instants = values
        .iter()
        .filter(|value| !value.trim().is_empty())
        .map(|value| parse_instant(value))
        .collect::<Result<Vec<_>>>()?;
    instants.sort();
    instants.dedup();
    Ok(instants)
}

pub fn current_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir()?)
}
