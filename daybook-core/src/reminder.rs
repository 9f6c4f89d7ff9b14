//! Reminder fire-time computation.
//!
//! Only decides *when* reminders fire. Delivery belongs to whoever consumes
//! the schedule, which must re-check the reminder at fire time: the event may
//! have been deleted or the reminder disabled in the meantime.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::DaybookResult;
use crate::event::{Event, Reminder, TimeOfDay};
use crate::timezone::TimeZoneConverter;

/// A reminder together with the instant it should fire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReminder {
    pub event_id: String,
    pub reminder: Reminder,
    pub fire_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReminderScheduler {
    converter: TimeZoneConverter,
}

impl ReminderScheduler {
    pub fn new(converter: TimeZoneConverter) -> Self {
        ReminderScheduler { converter }
    }

    /// The instant an event starts: its date and time (midnight when
    /// untimed) in its declared zone.
    pub fn event_instant(&self, event: &Event) -> DaybookResult<DateTime<Utc>> {
        let time = event.time.unwrap_or_else(TimeOfDay::midnight);
        self.converter.instant(event.date, time, event.timezone)
    }

    /// Enabled reminders that are still due after `now`, in reminder order.
    ///
    /// Depends on `now`, so recompute instead of caching.
    pub fn pending_fire_times(
        &self,
        event: &Event,
        now: DateTime<Utc>,
    ) -> DaybookResult<Vec<ScheduledReminder>> {
        let starts_at = self.event_instant(event)?;

        Ok(event
            .reminders
            .iter()
            .filter(|r| r.enabled)
            .map(|r| ScheduledReminder {
                event_id: event.id.clone(),
                reminder: r.clone(),
                fire_at: starts_at - Duration::minutes(i64::from(r.time)),
            })
            .filter(|s| s.fire_at > now)
            .collect())
    }

    /// The earliest pending reminder, if any.
    pub fn next_fire_time(
        &self,
        event: &Event,
        now: DateTime<Utc>,
    ) -> DaybookResult<Option<ScheduledReminder>> {
        Ok(self
            .pending_fire_times(event, now)?
            .into_iter()
            .min_by_key(|s| s.fire_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryRef;
    use crate::event::{EventTimezone, ReminderKind};
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::Tz;

    fn make_event() -> Event {
        Event {
            id: "event-1".to_string(),
            title: "Dentist".to_string(),
            description: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            time: TimeOfDay::new(15, 0),
            location: None,
            color: None,
            category: CategoryRef::default(),
            is_recurring: false,
            recurrence_type: None,
            recurrence_end: None,
            timezone: EventTimezone::Local,
            reminders: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn scheduler() -> ReminderScheduler {
        ReminderScheduler::new(TimeZoneConverter::new(Tz::UTC))
    }

    fn reminder(minutes: u32, enabled: bool) -> Reminder {
        Reminder {
            enabled,
            ..Reminder::new(ReminderKind::Notification, minutes)
        }
    }

    #[test]
    fn test_pending_fire_times_subtracts_minutes() {
        let mut event = make_event();
        event.reminders = vec![reminder(30, true), reminder(0, true)];
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();

        let pending = scheduler().pending_fire_times(&event, now).unwrap();
        let fire_times: Vec<_> = pending.iter().map(|s| s.fire_at).collect();
        assert_eq!(
            fire_times,
            vec![
                Utc.with_ymd_and_hms(2024, 3, 20, 14, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 20, 15, 0, 0).unwrap(),
            ]
        );
        assert!(pending.iter().all(|s| s.event_id == "event-1"));
    }

    #[test]
    fn test_pending_fire_times_excludes_past_and_disabled() {
        let mut event = make_event();
        event.reminders = vec![
            reminder(60, true),  // 14:00, exactly now
            reminder(120, true), // 13:00, past
            reminder(10, false), // disabled
            reminder(5, true),   // 14:55
        ];
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 14, 0, 0).unwrap();

        let pending = scheduler().pending_fire_times(&event, now).unwrap();
        assert_eq!(pending.len(), 1, "Got {:?}", pending);
        assert_eq!(pending[0].reminder.time, 5);
    }

    #[test]
    fn test_untimed_event_uses_midnight() {
        let mut event = make_event();
        event.time = None;
        event.reminders = vec![reminder(60, true)];
        let now = Utc.with_ymd_and_hms(2024, 3, 19, 0, 0, 0).unwrap();

        let pending = scheduler().pending_fire_times(&event, now).unwrap();
        assert_eq!(
            pending[0].fire_at,
            Utc.with_ymd_and_hms(2024, 3, 19, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_jst_event_converted_to_absolute_time() {
        let mut event = make_event();
        event.timezone = EventTimezone::Jst;
        event.reminders = vec![reminder(15, true)];
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();

        // 15:00 JST is 06:00 UTC
        let pending = scheduler().pending_fire_times(&event, now).unwrap();
        assert_eq!(
            pending[0].fire_at,
            Utc.with_ymd_and_hms(2024, 3, 20, 5, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_next_fire_time_picks_earliest() {
        let mut event = make_event();
        event.reminders = vec![reminder(5, true), reminder(45, true), reminder(15, true)];
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();

        let next = scheduler().next_fire_time(&event, now).unwrap().unwrap();
        assert_eq!(next.reminder.time, 45);

        let late = Utc.with_ymd_and_hms(2024, 3, 21, 0, 0, 0).unwrap();
        assert!(scheduler().next_fire_time(&event, late).unwrap().is_none());
    }
}
