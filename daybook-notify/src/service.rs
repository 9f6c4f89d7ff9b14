//! Notification permission state and the platform seam.

use std::sync::{Arc, PoisonError, RwLock};

use daybook_core::{Event, Reminder};

use crate::error::{NotifyError, NotifyResult};

pub const NOTIFICATION_TITLE: &str = "Calendar Reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    /// Not asked yet
    #[default]
    Default,
    Granted,
    Denied,
}

/// Platform notification API.
pub trait Notifier: Send + Sync {
    fn request_permission(&self) -> Permission;

    /// Display a notification. `tag` groups notifications for the same event.
    fn show(&self, title: &str, body: &str, tag: &str) -> NotifyResult<()>;
}

/// One per process, constructed by the caller and shared by handle.
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    permission: RwLock<Permission>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        NotificationService {
            notifier,
            permission: RwLock::new(Permission::Default),
        }
    }

    pub fn permission(&self) -> Permission {
        *self.permission.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the platform for permission. Returns true if granted.
    pub fn request_permission(&self) -> bool {
        let permission = self.notifier.request_permission();
        *self.permission.write().unwrap_or_else(PoisonError::into_inner) = permission;

        tracing::debug!(?permission, "notification permission");
        permission == Permission::Granted
    }

    pub fn notify_reminder(&self, event: &Event, reminder: &Reminder) -> NotifyResult<()> {
        if self.permission() != Permission::Granted {
            return Err(NotifyError::PermissionDenied);
        }

        tracing::info!(
            event_id = %event.id,
            reminder_id = %reminder.id,
            minutes_before = reminder.time,
            "showing reminder"
        );
        self.notifier
            .show(NOTIFICATION_TITLE, &reminder_body(event), &event.id)
    }

    /// Show a sample notification, asking for permission first if needed.
    pub fn show_test_notification(&self) -> NotifyResult<()> {
        if self.permission() != Permission::Granted && !self.request_permission() {
            return Err(NotifyError::PermissionDenied);
        }

        self.notifier
            .show(NOTIFICATION_TITLE, "Test Notification at 12:00", "test")
    }
}

/// "Title at HH:mm", or just the title for untimed events.
pub fn reminder_body(event: &Event) -> String {
    match &event.time {
        Some(time) => format!("{} at {}", event.title, time),
        None => event.title.clone(),
    }
}
