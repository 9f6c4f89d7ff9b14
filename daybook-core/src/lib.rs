//! Core of the daybook calendar.
//!
//! - `event`, `category`: the stored data model and its lifecycle
//! - `recurrence`, `occurrence`: expanding recurring events into dated
//!   occurrences and indexing them by day, week and month
//! - `timezone`, `reminder`: local/JST conversion and reminder fire times
//! - `export`, `import`: JSON, CSV and iCalendar interchange
//! - `config`, `store`, `daybook`: configuration, persistence and the
//!   top-level handle

pub mod category;
pub mod config;
pub mod constants;
pub mod csv;
pub mod daybook;
pub mod error;
pub mod event;
pub mod export;
pub mod ics;
pub mod import;
pub mod json;
pub mod occurrence;
pub mod recurrence;
pub mod reminder;
pub mod store;
pub mod timezone;

pub use category::{CategoryRef, CategoryResolver, EventCategory};
pub use config::{DaybookConfig, WeekStart};
pub use daybook::Daybook;
pub use error::{DaybookError, DaybookResult};
pub use event::{
    Event, EventDraft, EventPatch, EventTimezone, RecurrenceType, Reminder, ReminderKind,
    TimeOfDay,
};
pub use export::{ExportDateRange, ExportFormat, ExportOptions};
pub use import::ImportResult;
pub use occurrence::Occurrence;
pub use reminder::{ReminderScheduler, ScheduledReminder};
pub use store::{EventStore, InMemoryStore, JsonFileStore};
pub use timezone::{TimeZoneConverter, ZonedTime};
