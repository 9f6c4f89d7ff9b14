//! Occurrence lookup for calendar views.
//!
//! The month grid asks for one day at a time (about 42 calls per rendered
//! month), so lookups only expand each series up to the requested date.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{DaybookError, DaybookResult};
use crate::event::Event;
use crate::recurrence;

/// One concrete day an event appears on. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    #[serde(flatten)]
    pub event: Event,
    pub display_date: NaiveDate,
}

impl Occurrence {
    pub fn new(event: &Event, display_date: NaiveDate) -> Self {
        Occurrence {
            event: event.clone(),
            display_date,
        }
    }

    /// A standalone event for this single occurrence (date moved to the
    /// display date, recurrence switched off).
    pub fn as_event(&self) -> Event {
        Event {
            date: self.display_date,
            is_recurring: false,
            ..self.event.clone()
        }
    }
}

/// All occurrences landing on `date`, in the order of `events`.
///
/// An event whose recurrence configuration is invalid shows up as a single
/// occurrence on its anchor date.
pub fn occurrences_on(events: &[Event], date: NaiveDate) -> DaybookResult<Vec<Occurrence>> {
    let mut found = Vec::new();
    for event in events {
        found.extend(expand_lenient(event, date, date)?);
    }
    Ok(found)
}

/// All occurrences within `[start, end]`, ordered by date, then time
/// (untimed first), then input order.
pub fn occurrences_between(
    events: &[Event],
    start: NaiveDate,
    end: NaiveDate,
) -> DaybookResult<Vec<Occurrence>> {
    let mut found = Vec::new();
    for event in events {
        found.extend(expand_lenient(event, start, end)?);
    }
    found.sort_by_key(|o| (o.display_date, o.event.time));
    Ok(found)
}

fn expand_lenient(
    event: &Event,
    start: NaiveDate,
    end: NaiveDate,
) -> DaybookResult<Vec<Occurrence>> {
    match recurrence::expand_between(event, start, end) {
        Err(DaybookError::InvalidRecurrence { event_id, reason }) => {
            tracing::warn!(
                event_id = %event_id,
                reason = %reason,
                "invalid recurrence, treating event as non-recurring"
            );
            let single = (start..=end)
                .contains(&event.date)
                .then(|| Occurrence::new(event, event.date));
            Ok(single.into_iter().collect())
        }
        other => other,
    }
}

/// Occurrences whose time falls in the given hour. Untimed occurrences
/// belong to hour 0.
pub fn occurrences_in_hour(occurrences: &[Occurrence], hour: u32) -> Vec<&Occurrence> {
    occurrences
        .iter()
        .filter(|o| o.event.time.map_or(0, |t| t.hour()) == hour)
        .collect()
}

/// Dates shown by a month grid with Sunday-start weeks.
pub fn month_grid(month: NaiveDate) -> Vec<NaiveDate> {
    month_grid_with(month, Weekday::Sun)
}

/// Dates from the start of the week containing the first of `month` through
/// the end of the week containing its last day.
pub fn month_grid_with(month: NaiveDate, week_start: Weekday) -> Vec<NaiveDate> {
    let first = month - Days::new(u64::from(month.day0()));
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);

    let grid_start = start_of_week(first, week_start);
    let grid_end = start_of_week(last, week_start)
        .checked_add_days(Days::new(6))
        .unwrap_or(NaiveDate::MAX);

    grid_start.iter_days().take_while(|d| *d <= grid_end).collect()
}

/// The seven dates of the week containing `date`.
pub fn week_days(date: NaiveDate, week_start: Weekday) -> Vec<NaiveDate> {
    start_of_week(date, week_start).iter_days().take(7).collect()
}

fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset =
        (date.weekday().num_days_from_monday() + 7 - week_start.num_days_from_monday()) % 7;
    // clamps at the first representable date
    date.checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(NaiveDate::MIN)
}
