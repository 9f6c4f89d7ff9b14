//! The result contract shared by every importer.

use serde::Serialize;

use crate::event::Event;
use crate::export::ExportFormat;
use crate::timezone::TimeZoneConverter;
use crate::{csv, ics, json};

/// Outcome of an import.
///
/// Broken records are skipped and reported in `errors` while the rest of the
/// batch is accepted. A document that can't be read at all yields a single
/// error and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub events_added: usize,
    pub events_skipped: usize,
    pub errors: Vec<String>,
    /// The accepted events, in document order
    #[serde(skip)]
    pub events: Vec<Event>,
}

impl ImportResult {
    pub(crate) fn from_records(events: Vec<Event>, errors: Vec<String>) -> Self {
        ImportResult {
            success: errors.is_empty(),
            events_added: events.len(),
            events_skipped: errors.len(),
            errors,
            events,
        }
    }

    /// A whole-document failure.
    pub(crate) fn failed(message: &str) -> Self {
        ImportResult {
            success: false,
            events_added: 0,
            events_skipped: 0,
            errors: vec![message.to_string()],
            events: Vec::new(),
        }
    }

    pub(crate) fn log_summary(&self, format: ExportFormat) {
        tracing::info!(
            format = format.extension(),
            added = self.events_added,
            skipped = self.events_skipped,
            success = self.success,
            "imported events"
        );
    }
}

/// Import a document in the given format.
pub fn import(text: &str, format: ExportFormat, converter: &TimeZoneConverter) -> ImportResult {
    match format {
        ExportFormat::Json => json::from_json(text),
        ExportFormat::Csv => csv::from_csv(text),
        ExportFormat::Ics => ics::from_ics(text, converter),
    }
}
