//! CSV dataset loader
//!
//! Reads `users.csv`, `items.csv` and `events.csv` and applies the cleansing
//! rules of the legacy batch job before handing records to the engine:
//!
//! - rows without an id are dropped (items also need a title), as are rows
//!   that cannot be decoded
//! - missing gender/region become `"Unknown"`, missing age the median age
//! - missing content type/genre become `"unknown"`
//! - missing watch duration becomes 0, missing event type `"play"`
//!
//! Events referencing ids absent from the user or item files are kept; the
//! aggregator flags them in its diagnostics.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use streamrec_core::DatasetConfig;
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::types::{Event, Item, User};

const UNKNOWN_DEMOGRAPHIC: &str = "Unknown";
const UNKNOWN_CATEGORY: &str = "unknown";
const DEFAULT_EVENT_TYPE: &str = "play";

#[derive(Debug, Deserialize)]
struct UserRow {
    user_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    age: Option<f64>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    item_id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    genre: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventRow {
    user_id: Option<String>,
    item_id: Option<String>,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    watch_seconds: Option<f64>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Per-file cleansing counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    /// Missing fields replaced by a default
    pub fields_filled: usize,
}

/// What the loader changed or discarded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleansingReport {
    pub users: FileReport,
    pub items: FileReport,
    pub events: FileReport,
}

/// Cleansed records ready for [`crate::snapshot::BuildSnapshot`]
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub users: Vec<User>,
    pub items: Vec<Item>,
    pub events: Vec<Event>,
    pub report: CleansingReport,
}

impl Dataset {
    pub fn load(config: &DatasetConfig) -> Result<Self> {
        let (users, users_report) = read_users(&config.users_path())?;
        let (items, items_report) = read_items(&config.items_path())?;
        let (events, events_report) = read_events(&config.events_path())?;

        let report = CleansingReport {
            users: users_report,
            items: items_report,
            events: events_report,
        };

        info!(
            data_dir = %config.data_dir.display(),
            users = users.len(),
            items = items.len(),
            events = events.len(),
            "Dataset loaded"
        );

        Ok(Self {
            users,
            items,
            events,
            report,
        })
    }
}

fn open(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| {
        EngineError::Dataset(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file))
}

/// Present and non-blank
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn fill(value: Option<String>, default: &str, filled: &mut usize) -> String {
    present(value).unwrap_or_else(|| {
        *filled += 1;
        default.to_string()
    })
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Count a row and unwrap it; undecodable rows are dropped, I/O errors abort
fn decode<T>(file: &str, row: csv::Result<T>, report: &mut FileReport) -> Result<Option<T>> {
    report.rows_read += 1;
    match row {
        Ok(row) => Ok(Some(row)),
        Err(err) if err.is_io_error() => Err(err.into()),
        Err(err) => {
            warn!(
                file,
                line = err.position().map(|pos| pos.line()),
                error = %err,
                "Dropping undecodable row"
            );
            report.rows_dropped += 1;
            Ok(None)
        }
    }
}

fn read_users(path: &Path) -> Result<(Vec<User>, FileReport)> {
    let mut report = FileReport::default();
    let mut users = Vec::new();

    for row in open(path)?.deserialize::<UserRow>() {
        let Some(row) = decode("users", row, &mut report)? else {
            continue;
        };

        let Some(user_id) = present(row.user_id) else {
            report.rows_dropped += 1;
            continue;
        };
        let mut user = User::new(user_id);
        user.age = row.age.filter(|age| age.is_finite());
        user.gender = Some(fill(row.gender, UNKNOWN_DEMOGRAPHIC, &mut report.fields_filled));
        user.region = Some(fill(row.region, UNKNOWN_DEMOGRAPHIC, &mut report.fields_filled));
        users.push(user);
    }

    let mut ages: Vec<f64> = users.iter().filter_map(|u| u.age).collect();
    if let Some(median_age) = median(&mut ages) {
        for user in users.iter_mut().filter(|u| u.age.is_none()) {
            user.age = Some(median_age);
            report.fields_filled += 1;
        }
    }

    log_report("users", &report);
    Ok((users, report))
}

fn read_items(path: &Path) -> Result<(Vec<Item>, FileReport)> {
    let mut report = FileReport::default();
    let mut items = Vec::new();

    for row in open(path)?.deserialize::<ItemRow>() {
        let Some(row) = decode("items", row, &mut report)? else {
            continue;
        };

        let (Some(item_id), Some(title)) = (present(row.item_id), present(row.title)) else {
            report.rows_dropped += 1;
            continue;
        };
        let content_type = fill(row.content_type, UNKNOWN_CATEGORY, &mut report.fields_filled);
        let genre = fill(row.genre, UNKNOWN_CATEGORY, &mut report.fields_filled);
        items.push(Item::new(item_id, title, content_type, genre));
    }

    log_report("items", &report);
    Ok((items, report))
}

fn read_events(path: &Path) -> Result<(Vec<Event>, FileReport)> {
    let mut report = FileReport::default();
    let mut events = Vec::new();

    for row in open(path)?.deserialize::<EventRow>() {
        let Some(row) = decode("events", row, &mut report)? else {
            continue;
        };

        let (Some(user_id), Some(item_id)) = (present(row.user_id), present(row.item_id)) else {
            report.rows_dropped += 1;
            continue;
        };
        let event_type = fill(row.event_type, DEFAULT_EVENT_TYPE, &mut report.fields_filled);
        let watch_seconds = row.watch_seconds.unwrap_or_else(|| {
            report.fields_filled += 1;
            0.0
        });

        let mut event = Event::new(user_id, item_id, event_type, watch_seconds);
        if let Some(timestamp) = present(row.timestamp).as_deref().and_then(parse_timestamp) {
            event = event.at(timestamp);
        }
        events.push(event);
    }

    log_report("events", &report);
    Ok((events, report))
}

/// RFC 3339 or `YYYY-MM-DD HH:MM:SS` (taken as UTC)
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ts| ts.and_utc())
        })
        .ok()
}

fn log_report(file: &str, report: &FileReport) {
    if report.rows_dropped > 0 || report.fields_filled > 0 {
        warn!(
            file,
            rows_read = report.rows_read,
            rows_dropped = report.rows_dropped,
            fields_filled = report.fields_filled,
            "Cleansed dataset file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [30.0, 10.0, 20.0]), Some(20.0));
        assert_eq!(median(&mut [40.0, 10.0, 20.0, 30.0]), Some(25.0));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-03-01 10:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_fill_counts_defaults() {
        let mut filled = 0;
        assert_eq!(fill(Some("F".into()), "Unknown", &mut filled), "F");
        assert_eq!(fill(Some("  ".into()), "Unknown", &mut filled), "Unknown");
        assert_eq!(fill(None, "Unknown", &mut filled), "Unknown");
        assert_eq!(filled, 2);
    }
}
