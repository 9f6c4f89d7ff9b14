//! ICS document generation.

use chrono::{DateTime, Utc};

use super::escape_text;
use crate::constants::ICS_PRODID;
use crate::event::Event;
use crate::export::{ExportOptions, filter_events};

/// Generate a VCALENDAR with one all-day VEVENT per selected event.
///
/// Lines are CRLF-separated. Optional properties are left out entirely
/// rather than written empty.
pub fn to_ics(events: &[Event], options: &ExportOptions, now: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{ICS_PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
    ];

    let dtstamp = now.format("%Y%m%dT%H%M%SZ").to_string();

    for event in filter_events(events, options) {
        let day = event.date.format("%Y%m%d").to_string();

        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", event.id));
        lines.push(format!("DTSTART:{day}"));
        lines.push(format!("DTEND:{day}"));
        lines.push(format!("SUMMARY:{}", escape_text(&event.title)));

        if let Some(desc) = event.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(format!("DESCRIPTION:{}", escape_text(desc)));
        }

        if let Some(loc) = event.location.as_deref().filter(|l| !l.is_empty()) {
            lines.push(format!("LOCATION:{}", escape_text(loc)));
        }

        lines.push(format!("DTSTAMP:{dtstamp}"));
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}
