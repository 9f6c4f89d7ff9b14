//! Reminder delivery for daybook.
//!
//! `daybook-core` decides when reminders are due. This crate owns the
//! notification permission state and runs the timers that hand due reminders
//! to a platform [`Notifier`].

pub mod dispatcher;
pub mod error;
pub mod service;

pub use dispatcher::{EventLookup, ReminderDispatcher};
pub use error::{NotifyError, NotifyResult};
pub use service::{NOTIFICATION_TITLE, NotificationService, Notifier, Permission};
