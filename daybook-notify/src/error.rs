use daybook_core::DaybookError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification permission not granted")]
    PermissionDenied,

    #[error("Notification backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Core(#[from] DaybookError),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
