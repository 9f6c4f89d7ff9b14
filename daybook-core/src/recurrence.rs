//! Fixed-step recurrence expansion.
//!
//! A recurring event repeats weekly or monthly from its anchor date up to and
//! including its recurrence end. Monthly steps are always taken from the
//! anchor, so a series anchored on the 31st lands on the 31st whenever the
//! month has one and on the month's last day otherwise.

use chrono::{Days, Months, NaiveDate};

use crate::constants::MAX_OCCURRENCES;
use crate::error::{DaybookError, DaybookResult};
use crate::event::{Event, RecurrenceType};
use crate::occurrence::Occurrence;

/// Expand an event into its occurrences, in ascending date order.
///
/// Non-recurring events yield exactly one occurrence on their anchor date.
/// Fails with `InvalidRecurrence` for a recurring event without a type or end
/// date (or ending before its anchor), and with `RecurrenceTooLong` past
/// [`MAX_OCCURRENCES`].
pub fn expand(event: &Event) -> DaybookResult<Vec<Occurrence>> {
    occurrence_dates(event)?
        .enumerate()
        .map(|(n, date)| check_cap(event, n).map(|_| Occurrence::new(event, date)))
        .collect()
}

/// Like [`expand`], restricted to occurrences within `[start, end]`.
///
/// Iteration stops at `end`, so the occurrence cap only trips if the series
/// is too long before the window closes.
pub fn expand_between(
    event: &Event,
    start: NaiveDate,
    end: NaiveDate,
) -> DaybookResult<Vec<Occurrence>> {
    let mut occurrences = Vec::new();

    for (n, date) in occurrence_dates(event)?.enumerate() {
        if date > end {
            break;
        }
        check_cap(event, n)?;
        if date >= start {
            occurrences.push(Occurrence::new(event, date));
        }
    }

    Ok(occurrences)
}

/// Lazily yields the dates an event occurs on.
pub fn occurrence_dates(event: &Event) -> DaybookResult<OccurrenceDates> {
    if !event.is_recurring {
        return Ok(OccurrenceDates {
            anchor: event.date,
            step: None,
            end: event.date,
            index: 0,
        });
    }

    let (step, end) = event.recurrence()?;
    Ok(OccurrenceDates {
        anchor: event.date,
        step: Some(step),
        end,
        index: 0,
    })
}

fn check_cap(event: &Event, n: usize) -> DaybookResult<()> {
    if n >= MAX_OCCURRENCES {
        return Err(DaybookError::RecurrenceTooLong {
            event_id: event.id.clone(),
            limit: MAX_OCCURRENCES,
        });
    }
    Ok(())
}

/// Iterator over the occurrence dates of one event.
#[derive(Debug, Clone)]
pub struct OccurrenceDates {
    anchor: NaiveDate,
    step: Option<RecurrenceType>,
    end: NaiveDate,
    index: u32,
}

impl Iterator for OccurrenceDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let date = match self.step {
            None if self.index == 0 => self.anchor,
            None => return None,
            Some(step) => nth_step(self.anchor, step, self.index)?,
        };

        // Day granularity, inclusive
        if date > self.end {
            return None;
        }

        self.index = self.index.checked_add(1)?;
        Some(date)
    }
}

/// The date `n` steps after `anchor`, or `None` past the representable range.
fn nth_step(anchor: NaiveDate, step: RecurrenceType, n: u32) -> Option<NaiveDate> {
    match step {
        RecurrenceType::Weekly => anchor.checked_add_days(Days::new(u64::from(n) * 7)),
        // chrono clamps to the last day of shorter months
        RecurrenceType::Monthly => anchor.checked_add_months(Months::new(n)),
    }
}
