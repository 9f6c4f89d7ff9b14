//! CSV export and import.
//!
//! Columns: `Title,Date,Time,Location,Description,Category,Timezone`.
//! Title, Location and Description are always quoted; other fields only when
//! they need it. Embedded quotes are doubled.

use chrono::{NaiveDate, Utc};

use crate::category::{CategoryRef, EventCategory};
use crate::constants::{CSV_HEADERS, DEFAULT_CATEGORY_COLOR, IMPORTED_CATEGORY_ID};
use crate::event::{Event, EventTimezone, TimeOfDay};
use crate::export::{ExportFormat, ExportOptions, filter_events};
use crate::import::ImportResult;

pub const INVALID_CSV: &str = "Invalid CSV format";

pub fn to_csv(events: &[Event], options: &ExportOptions) -> String {
    let mut rows = vec![CSV_HEADERS.join(",")];

    for event in filter_events(events, options) {
        let category = event
            .category
            .name()
            .unwrap_or_else(|| event.category.id());
        let time = event.time.map(|t| t.to_string()).unwrap_or_default();

        let fields = [
            quote(&event.title),
            escape(&event.date.format("%Y-%m-%d").to_string()),
            escape(&time),
            quote(event.location.as_deref().unwrap_or_default()),
            quote(event.description.as_deref().unwrap_or_default()),
            escape(category),
            escape(event.timezone.as_str()),
        ];
        rows.push(fields.join(","));
    }

    rows.join("\n")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quote(value)
    } else {
        value.to_string()
    }
}

/// Import rows positionally. Blank lines are ignored; rows without a title
/// or date are skipped and reported by line number.
pub fn from_csv(text: &str) -> ImportResult {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let now = Utc::now();
    let mut events = Vec::new();
    let mut errors = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(%err, "unreadable CSV document");
                return ImportResult::failed(INVALID_CSV);
            }
        };

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        // Header is line 1
        let row = record.position().map_or(index + 2, |p| {
            line_number(text, usize::try_from(p.byte()).unwrap_or(usize::MAX))
        });
        let field = |i: usize| record.get(i).unwrap_or_default();

        let title = field(0);
        let date = field(1).trim();
        if title.trim().is_empty() || date.is_empty() {
            tracing::debug!(row, "skipping row without title or date");
            errors.push(format!("Row {row}: Missing required fields"));
            continue;
        }

        let Some(event) = row_to_event(&record, now) else {
            tracing::debug!(row, "skipping malformed row");
            errors.push(format!("Row {row}: Invalid format"));
            continue;
        };
        events.push(event);
    }

    let result = ImportResult::from_records(events, errors);
    result.log_summary(ExportFormat::Csv);
    result
}

/// 1-based line a record starts on. The reader's offset may sit on blank
/// lines it skipped before the record, so those are stepped over first.
fn line_number(text: &str, offset: usize) -> usize {
    let bytes = text.as_bytes();
    let start = bytes
        .get(offset..)
        .and_then(|rest| rest.iter().position(|b| !matches!(*b, b'\r' | b'\n')))
        .map_or(bytes.len(), |i| offset + i);

    bytes[..start].iter().filter(|b| **b == b'\n').count() + 1
}

fn row_to_event(record: &::csv::StringRecord, now: chrono::DateTime<Utc>) -> Option<Event> {
    let field = |i: usize| record.get(i).unwrap_or_default();
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

    let date = NaiveDate::parse_from_str(field(1).trim(), "%Y-%m-%d").ok()?;
    let time = match field(2).trim() {
        "" => None,
        t => Some(t.parse::<TimeOfDay>().ok()?),
    };
    let category_name = match field(5).trim() {
        "" => "Imported",
        name => name,
    };
    let timezone = match field(6).trim() {
        "JST" => EventTimezone::Jst,
        _ => EventTimezone::Local,
    };

    Some(Event {
        id: format!("imported-{}", uuid::Uuid::new_v4()),
        title: field(0).to_string(),
        description: non_empty(field(4)),
        date,
        time,
        location: non_empty(field(3)),
        color: None,
        category: CategoryRef::Category(EventCategory {
            id: IMPORTED_CATEGORY_ID.to_string(),
            name: category_name.to_string(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: None,
        }),
        is_recurring: false,
        recurrence_type: None,
        recurrence_end: None,
        timezone,
        reminders: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}
