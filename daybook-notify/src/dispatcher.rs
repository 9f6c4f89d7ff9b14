//! Timers that fire reminders at their scheduled instant.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use daybook_core::{Event, EventStore, ReminderScheduler, ScheduledReminder};
use tokio::task::JoinHandle;

use crate::error::{NotifyError, NotifyResult};
use crate::service::NotificationService;

/// Current state of an event, consulted when a timer fires.
pub trait EventLookup: Send + Sync {
    fn find_event(&self, event_id: &str) -> Option<Event>;
}

impl<S: EventStore> EventLookup for S {
    fn find_event(&self, event_id: &str) -> Option<Event> {
        match self.load() {
            Ok(events) => events.into_iter().find(|e| e.id == event_id),
            Err(err) => {
                tracing::warn!(%err, event_id, "could not load events for reminder");
                None
            }
        }
    }
}

type Handles = HashMap<String, Vec<JoinHandle<()>>>;

/// Runs one tokio task per pending reminder.
///
/// Timers for an event are tracked so they can be cancelled when the event
/// changes or goes away. A firing timer still re-checks the event through
/// [`EventLookup`]; it only notifies if the event exists and the reminder is
/// still enabled.
pub struct ReminderDispatcher {
    scheduler: ReminderScheduler,
    service: Arc<NotificationService>,
    lookup: Arc<dyn EventLookup>,
    handles: Mutex<Handles>,
}

impl ReminderDispatcher {
    pub fn new(
        scheduler: ReminderScheduler,
        service: Arc<NotificationService>,
        lookup: Arc<dyn EventLookup>,
    ) -> Self {
        ReminderDispatcher {
            scheduler,
            service,
            lookup,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Schedule every pending reminder of `event`, replacing any timers
    /// already running for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_event(
        &self,
        event: &Event,
        now: DateTime<Utc>,
    ) -> NotifyResult<Vec<ScheduledReminder>> {
        self.cancel_event(&event.id);

        let pending = self.scheduler.pending_fire_times(event, now)?;
        if pending.is_empty() {
            return Ok(pending);
        }

        let handles = pending.iter().map(|s| self.spawn(s.clone(), now)).collect();
        let mut tracked = self.lock_handles();
        prune_finished(&mut tracked);
        tracked.insert(event.id.clone(), handles);
        drop(tracked);

        tracing::debug!(event_id = %event.id, count = pending.len(), "scheduled reminders");
        Ok(pending)
    }

    /// Schedule all events. An event whose start can't be resolved is
    /// skipped with a warning. Returns the number of timers started.
    pub fn schedule_all(&self, events: &[Event], now: DateTime<Utc>) -> usize {
        let mut started = 0;
        for event in events {
            match self.schedule_event(event, now) {
                Ok(pending) => started += pending.len(),
                Err(NotifyError::Core(err)) => {
                    tracing::warn!(event_id = %event.id, %err, "skipping reminders");
                }
                Err(err) => {
                    tracing::warn!(event_id = %event.id, %err, "could not schedule reminders");
                }
            }
        }
        tracing::info!(events = events.len(), timers = started, "scheduled reminders");
        started
    }

    /// Abort outstanding timers for an event. Returns how many were aborted.
    pub fn cancel_event(&self, event_id: &str) -> usize {
        let Some(handles) = self.lock_handles().remove(event_id) else {
            return 0;
        };

        let aborted = abort_unfinished(handles);
        if aborted > 0 {
            tracing::debug!(event_id, aborted, "cancelled reminders");
        }
        aborted
    }

    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.lock_handles().drain().collect();
        let aborted: usize = drained
            .into_iter()
            .map(|(_, handles)| abort_unfinished(handles))
            .sum();
        tracing::debug!(aborted, "cancelled all reminders");
    }

    /// Timers that have not fired yet.
    pub fn pending_count(&self) -> usize {
        let mut tracked = self.lock_handles();
        prune_finished(&mut tracked);
        tracked.values().map(Vec::len).sum()
    }

    fn spawn(&self, scheduled: ScheduledReminder, now: DateTime<Utc>) -> JoinHandle<()> {
        let delay = (scheduled.fire_at - now).to_std().unwrap_or_default();
        let service = Arc::clone(&self.service);
        let lookup = Arc::clone(&self.lookup);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(&service, lookup.as_ref(), &scheduled);
        })
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Handles> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ReminderDispatcher {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Forget timers that already fired, and events left with none.
fn prune_finished(handles: &mut Handles) {
    handles.retain(|_, timers| {
        timers.retain(|h| !h.is_finished());
        !timers.is_empty()
    });
}

fn abort_unfinished(handles: Vec<JoinHandle<()>>) -> usize {
    let mut aborted = 0;
    for handle in handles {
        if !handle.is_finished() {
            handle.abort();
            aborted += 1;
        }
    }
    aborted
}

fn fire(service: &NotificationService, lookup: &dyn EventLookup, scheduled: &ScheduledReminder) {
    let event_id = scheduled.event_id.as_str();
    let reminder_id = scheduled.reminder.id.as_str();

    let Some(event) = lookup.find_event(event_id) else {
        tracing::info!(event_id, reminder_id, "event no longer exists, reminder suppressed");
        return;
    };
    let Some(reminder) = event
        .reminders
        .iter()
        .find(|r| r.id == reminder_id && r.enabled)
    else {
        tracing::info!(event_id, reminder_id, "reminder removed or disabled, suppressed");
        return;
    };

    match service.notify_reminder(&event, reminder) {
        Ok(()) => {}
        Err(NotifyError::PermissionDenied) => {
            tracing::info!(event_id, reminder_id, "no notification permission, reminder suppressed");
        }
        Err(err) => {
            tracing::warn!(event_id, reminder_id, %err, "failed to show reminder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Permission;
    use crate::service::tests::RecordingNotifier;
    use chrono::{NaiveDate, TimeZone};
    use daybook_core::{
        EventDraft, EventPatch, InMemoryStore, Reminder, ReminderKind, TimeZoneConverter,
    };
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    /// Event at 10:00 UTC with a reminder 30 minutes before.
    fn standup() -> Event {
        let draft = EventDraft {
            title: "Standup".into(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            time: Some("10:00".parse().unwrap()),
            reminders: vec![Reminder::new(ReminderKind::Notification, 30)],
            ..Default::default()
        };
        Event::create(draft, now()).unwrap()
    }

    struct Fixture {
        notifier: Arc<RecordingNotifier>,
        store: Arc<InMemoryStore>,
        dispatcher: ReminderDispatcher,
    }

    fn fixture(answer: Permission, events: Vec<Event>) -> Fixture {
        let notifier = RecordingNotifier::new(answer);
        let service = Arc::new(NotificationService::new(notifier.clone()));
        service.request_permission();

        let store = Arc::new(InMemoryStore::new(events));
        let scheduler = ReminderScheduler::new(TimeZoneConverter::new(chrono_tz::Tz::UTC));
        let dispatcher = ReminderDispatcher::new(scheduler, service, store.clone());

        Fixture {
            notifier,
            store,
            dispatcher,
        }
    }

    async fn advance_minutes(minutes: u64) {
        tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_scheduled_time() {
        let event = standup();
        let f = fixture(Permission::Granted, vec![event.clone()]);

        let scheduled = f.dispatcher.schedule_event(&event, now()).unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(
            scheduled[0].fire_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
        );

        advance_minutes(29).await;
        assert!(f.notifier.shown().is_empty());
        assert_eq!(f.dispatcher.pending_count(), 1);

        advance_minutes(2).await;
        let shown = f.notifier.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].1, "Standup at 10:00");
        assert_eq!(shown[0].2, event.id);
        assert_eq!(f.dispatcher.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_timers_are_forgotten() {
        let event = standup();
        let mut later = standup();
        later.time = Some("11:00".parse().unwrap());
        let f = fixture(Permission::Granted, vec![event.clone(), later.clone()]);

        f.dispatcher.schedule_event(&event, now()).unwrap();
        advance_minutes(31).await;
        assert_eq!(f.notifier.shown().len(), 1);

        f.dispatcher
            .schedule_event(&later, now() + chrono::Duration::minutes(31))
            .unwrap();
        {
            let tracked = f.dispatcher.lock_handles();
            assert!(!tracked.contains_key(&event.id));
            assert_eq!(tracked.get(&later.id).map(Vec::len), Some(1));
        }

        advance_minutes(60).await;
        assert_eq!(f.dispatcher.pending_count(), 0);
        assert!(f.dispatcher.lock_handles().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_reminders_are_not_scheduled() {
        let event = standup();
        let f = fixture(Permission::Granted, vec![event.clone()]);

        let late = Utc.with_ymd_and_hms(2024, 5, 1, 9, 45, 0).unwrap();
        assert!(f.dispatcher.schedule_event(&event, late).unwrap().is_empty());
        assert_eq!(f.dispatcher.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_event_aborts_timers() {
        let event = standup();
        let f = fixture(Permission::Granted, vec![event.clone()]);

        f.dispatcher.schedule_event(&event, now()).unwrap();
        assert_eq!(f.dispatcher.cancel_event(&event.id), 1);
        assert_eq!(f.dispatcher.cancel_event(&event.id), 0);

        advance_minutes(60).await;
        assert!(f.notifier.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_replaces_timers() {
        let event = standup();
        let f = fixture(Permission::Granted, vec![event.clone()]);

        f.dispatcher.schedule_event(&event, now()).unwrap();
        f.dispatcher.schedule_event(&event, now()).unwrap();
        assert_eq!(f.dispatcher.pending_count(), 1);

        advance_minutes(60).await;
        assert_eq!(f.notifier.shown().len(), 1);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_deleted_event_is_suppressed() {
        let event = standup();
        let f = fixture(Permission::Granted, vec![event.clone()]);

        f.dispatcher.schedule_event(&event, now()).unwrap();
        f.store.save(&[]).unwrap();

        advance_minutes(60).await;
        assert!(f.notifier.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_reminder_is_suppressed() {
        let event = standup();
        let f = fixture(Permission::Granted, vec![event.clone()]);
        f.dispatcher.schedule_event(&event, now()).unwrap();

        let mut reminders = event.reminders.clone();
        reminders[0].enabled = false;
        let mut events = f.store.load().unwrap();
        let patch = EventPatch {
            reminders: Some(reminders),
            ..Default::default()
        };
        assert!(daybook_core::event::update_event(&mut events, &event.id, patch, now()).unwrap());
        f.store.save(&events).unwrap();

        advance_minutes(60).await;
        assert!(f.notifier.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_permission_nothing_is_shown() {
        let event = standup();
        let f = fixture(Permission::Denied, vec![event.clone()]);

        f.dispatcher.schedule_event(&event, now()).unwrap();
        advance_minutes(60).await;
        assert!(f.notifier.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_all_counts_timers() {
        let first = standup();
        let mut second = standup();
        second.reminders.push(Reminder::new(ReminderKind::Email, 10));
        let f = fixture(Permission::Granted, vec![first.clone(), second.clone()]);

        assert_eq!(f.dispatcher.schedule_all(&[first, second], now()), 3);

        advance_minutes(60).await;
        assert_eq!(f.notifier.shown().len(), 3);
    }
}
