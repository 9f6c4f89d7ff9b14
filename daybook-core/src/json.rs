//! JSON export document and import.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::constants::EXPORT_VERSION;
use crate::error::{DaybookError, DaybookResult};
use crate::event::Event;
use crate::export::{ExportFormat, ExportOptions, filter_events};
use crate::import::ImportResult;

pub const INVALID_JSON: &str = "Invalid JSON format";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    version: &'a str,
    export_date: DateTime<Utc>,
    events: Vec<&'a Event>,
    options: &'a ExportOptions,
}

/// Pretty-printed `{version, exportDate, events, options}` document.
pub fn to_json(
    events: &[Event],
    options: &ExportOptions,
    now: DateTime<Utc>,
) -> DaybookResult<String> {
    let document = ExportDocument {
        version: EXPORT_VERSION,
        export_date: now,
        events: filter_events(events, options),
        options,
    };

    serde_json::to_string_pretty(&document).map_err(|e| DaybookError::Serialization(e.to_string()))
}

/// Import events from an export document.
///
/// A bare array of events (the storage format) is accepted too. Records need
/// a non-empty `title` and `date`; anything else missing is defaulted.
pub fn from_json(text: &str) -> ImportResult {
    let Ok(document) = serde_json::from_str::<Value>(text) else {
        tracing::warn!("import document is not valid JSON");
        return ImportResult::failed(INVALID_JSON);
    };

    let records: &[Value] = match &document {
        Value::Array(items) => items.as_slice(),
        Value::Object(fields) => match fields.get("events") {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                tracing::warn!("import document has a non-array `events` field");
                return ImportResult::failed(INVALID_JSON);
            }
        },
        _ => {
            tracing::warn!("import document is neither an object nor an array");
            return ImportResult::failed(INVALID_JSON);
        }
    };

    let mut events = Vec::new();
    let mut errors = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let position = index + 1;

        if !has_text(record, "title") || !has_text(record, "date") {
            tracing::debug!(position, "skipping event without title or date");
            errors.push(format!("Event {position}: Missing required fields"));
            continue;
        }

        match serde_json::from_value::<Event>(record.clone()) {
            Ok(event) => events.push(event),
            Err(err) => {
                tracing::debug!(position, %err, "skipping undecodable event");
                errors.push(format!("Event {position}: Invalid format"));
            }
        }
    }

    let result = ImportResult::from_records(events, errors);
    result.log_summary(ExportFormat::Json);
    result
}

fn has_text(record: &Value, field: &str) -> bool {
    record
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}
