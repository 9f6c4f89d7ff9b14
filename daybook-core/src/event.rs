//! Stored event definitions.
//!
//! An [`Event`] is one row per user-created entry, never one row per
//! occurrence. Recurring events are materialized on demand by
//! [`crate::recurrence`]; nothing derived from them is stored here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::category::CategoryRef;
use crate::error::{DaybookError, DaybookResult};

/// A calendar event definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default = "new_event_id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Anchor date, the first occurrence of a recurring series
    pub date: NaiveDate,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub time: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub category: CategoryRef,

    // Recurrence fields, ignored unless `is_recurring` is set
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub recurrence_type: Option<RecurrenceType>,
    /// Last day (inclusive) a recurring event may occur on
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub recurrence_end: Option<NaiveDate>,

    #[serde(default)]
    pub timezone: EventTimezone,
    #[serde(default)]
    pub reminders: Vec<Reminder>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Fixed recurrence step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Weekly,
    Monthly,
}

impl FromStr for RecurrenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(RecurrenceType::Weekly),
            "monthly" => Ok(RecurrenceType::Monthly),
            other => Err(format!("unknown recurrence type '{other}'")),
        }
    }
}

/// The zone an event's wall-clock time is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventTimezone {
    /// The executing environment's zone
    #[default]
    #[serde(rename = "local")]
    Local,
    /// Japan Standard Time (Asia/Tokyo)
    #[serde(rename = "JST")]
    Jst,
}

impl EventTimezone {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTimezone::Local => "local",
            EventTimezone::Jst => "JST",
        }
    }
}

impl fmt::Display for EventTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventTimezone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(EventTimezone::Local),
            "JST" => Ok(EventTimezone::Jst),
            other => Err(format!("unknown timezone '{other}'")),
        }
    }
}

/// A reminder owned by its event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(default = "new_reminder_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: ReminderKind,
    /// Minutes before the event to fire
    pub time: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl Reminder {
    pub fn new(kind: ReminderKind, minutes_before: u32) -> Self {
        Reminder {
            id: new_reminder_id(),
            kind,
            time: minutes_before,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    #[default]
    Notification,
    Email,
}

/// A 24h wall-clock time with minute precision, written `HH:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(TimeOfDay)
    }

    pub fn midnight() -> Self {
        TimeOfDay(NaiveTime::MIN)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl From<NaiveTime> for TimeOfDay {
    /// Truncates seconds.
    fn from(t: NaiveTime) -> Self {
        TimeOfDay(NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(NaiveTime::MIN))
    }
}

impl FromStr for TimeOfDay {
    type Err = DaybookError;

    /// Strict `HH:mm`: two-digit hour 00-23, colon, two-digit minute 00-59.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DaybookError::InvalidTime(s.to_string());

        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }

        let hour = u32::from(digits[0] - b'0') * 10 + u32::from(digits[1] - b'0');
        let minute = u32::from(digits[2] - b'0') * 10 + u32::from(digits[3] - b'0');
        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Form fields turn unset values into empty strings; treat those as absent.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn new_event_id() -> String {
    format!("event-{}", uuid::Uuid::new_v4())
}

fn new_reminder_id() -> String {
    format!("reminder-{}", uuid::Uuid::new_v4())
}

fn enabled_by_default() -> bool {
    true
}

/// Values collected by an event form before an [`Event`] exists.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<TimeOfDay>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub category: CategoryRef,
    pub is_recurring: bool,
    pub recurrence_type: Option<RecurrenceType>,
    pub recurrence_end: Option<NaiveDate>,
    /// Falls back to local when unset
    pub timezone: Option<EventTimezone>,
    pub reminders: Vec<Reminder>,
}

/// A partial update. `None` leaves a field untouched; for optional fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub time: Option<Option<TimeOfDay>>,
    pub location: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub category: Option<CategoryRef>,
    pub is_recurring: Option<bool>,
    pub recurrence_type: Option<Option<RecurrenceType>>,
    pub recurrence_end: Option<Option<NaiveDate>>,
    pub timezone: Option<EventTimezone>,
    pub reminders: Option<Vec<Reminder>>,
}

impl Event {
    /// Create a new event from form data, assigning a fresh id and timestamps.
    pub fn create(draft: EventDraft, now: DateTime<Utc>) -> DaybookResult<Self> {
        let date = draft
            .date
            .ok_or_else(|| DaybookError::InvalidEvent("date is required".into()))?;

        let event = Event {
            id: new_event_id(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            date,
            time: draft.time,
            location: draft.location,
            color: draft.color,
            category: draft.category,
            is_recurring: draft.is_recurring,
            recurrence_type: draft.recurrence_type,
            recurrence_end: draft.recurrence_end,
            timezone: draft.timezone.unwrap_or_default(),
            reminders: draft.reminders,
            created_at: now,
            updated_at: now,
        };
        event.validate()?;

        Ok(event)
    }

    /// Check the title and, for recurring events, the recurrence configuration.
    pub fn validate(&self) -> DaybookResult<()> {
        if self.title.trim().is_empty() {
            return Err(DaybookError::InvalidEvent(format!(
                "event '{}' has an empty title",
                self.id
            )));
        }

        if self.is_recurring {
            self.recurrence()?;
        }

        Ok(())
    }

    /// The recurrence step and inclusive end date of a recurring event.
    pub fn recurrence(&self) -> DaybookResult<(RecurrenceType, NaiveDate)> {
        let invalid = |reason: &str| DaybookError::InvalidRecurrence {
            event_id: self.id.clone(),
            reason: reason.to_string(),
        };

        let kind = self
            .recurrence_type
            .ok_or_else(|| invalid("recurrence type is missing"))?;
        let end = self
            .recurrence_end
            .ok_or_else(|| invalid("recurrence end is missing"))?;
        if end < self.date {
            return Err(invalid("recurrence ends before the anchor date"));
        }

        Ok((kind, end))
    }

    /// Apply a patch, refreshing `updated_at`. `id` and `created_at` never change.
    ///
    /// Does not validate; [`update_event`] does.
    pub fn apply(&mut self, patch: EventPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(is_recurring) = patch.is_recurring {
            self.is_recurring = is_recurring;
        }
        if let Some(recurrence_type) = patch.recurrence_type {
            self.recurrence_type = recurrence_type;
        }
        if let Some(recurrence_end) = patch.recurrence_end {
            self.recurrence_end = recurrence_end;
        }
        if let Some(timezone) = patch.timezone {
            self.timezone = timezone;
        }
        if let Some(reminders) = patch.reminders {
            self.reminders = reminders;
        }
        self.updated_at = now;
    }
}

/// Update the event with the given id. Returns false if no such event exists.
///
/// The patched event must still pass [`Event::validate`]; if it doesn't, the
/// error is returned and the stored event is left as it was.
pub fn update_event(
    events: &mut [Event],
    event_id: &str,
    patch: EventPatch,
    now: DateTime<Utc>,
) -> DaybookResult<bool> {
    let Some(event) = events.iter_mut().find(|e| e.id == event_id) else {
        return Ok(false);
    };

    let mut updated = event.clone();
    updated.apply(patch, now);
    updated.validate()?;
    *event = updated;

    Ok(true)
}

/// Remove the event with the given id, returning it.
pub fn delete_event(events: &mut Vec<Event>, event_id: &str) -> Option<Event> {
    let index = events.iter().position(|e| e.id == event_id)?;
    Some(events.remove(index))
}
