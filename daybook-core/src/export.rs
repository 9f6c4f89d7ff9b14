//! Export options and format dispatch.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DaybookResult;
use crate::event::Event;
use crate::{csv, ics, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Ics,
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Ics => "ics",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Ics => "text/calendar",
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }

    /// Format for a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ics" | "ical" => Some(ExportFormat::Ics),
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: ExportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<ExportDateRange>,
    #[serde(default = "include_recurring_by_default")]
    pub include_recurring: bool,
    /// Category ids to keep. Empty keeps every event.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

fn include_recurring_by_default() -> bool {
    true
}

impl ExportOptions {
    /// Options that export every event in the given format.
    pub fn new(format: ExportFormat) -> Self {
        ExportOptions {
            format,
            date_range: None,
            include_recurring: true,
            categories: Vec::new(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(ExportDateRange { start, end });
        self
    }

    pub fn with_include_recurring(mut self, include: bool) -> Self {
        self.include_recurring = include;
        self
    }

    pub fn includes(&self, event: &Event) -> bool {
        if !self.categories.is_empty() && !self.categories.iter().any(|c| c == event.category.id())
        {
            return false;
        }

        if event.is_recurring && !self.include_recurring {
            return false;
        }

        match self.date_range {
            Some(range) => overlaps(event, range),
            None => true,
        }
    }
}

/// A recurring series overlaps the range if any part of its span does;
/// everything else is judged by its anchor date.
fn overlaps(event: &Event, range: ExportDateRange) -> bool {
    let last = match event.recurrence() {
        Ok((_, end)) if event.is_recurring => end,
        _ => event.date,
    };
    event.date <= range.end && last >= range.start
}

/// Events selected by the export options, in input order.
pub fn filter_events<'a>(events: &'a [Event], options: &ExportOptions) -> Vec<&'a Event> {
    events.iter().filter(|e| options.includes(e)).collect()
}

/// Serialize events in the format named by `options`.
pub fn export(events: &[Event], options: &ExportOptions, now: DateTime<Utc>) -> DaybookResult<String> {
    let output = match options.format {
        ExportFormat::Json => json::to_json(events, options, now)?,
        ExportFormat::Csv => csv::to_csv(events, options),
        ExportFormat::Ics => ics::to_ics(events, options, now),
    };

    tracing::info!(
        format = options.format.extension(),
        events = events.len(),
        bytes = output.len(),
        "exported events"
    );

    Ok(output)
}
