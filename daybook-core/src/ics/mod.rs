//! iCalendar (RFC 5545) export and import.
//!
//! Export writes every event as an all-day VEVENT on its anchor date. Import
//! reads VEVENTs from any calendar document with the `icalendar` parser.

mod generate;
mod parse;

pub use generate::to_ics;
pub use parse::{INVALID_ICS, from_ics};

/// Escape a TEXT value: backslashes and line breaks. The parser undoes this
/// when reading.
fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}
