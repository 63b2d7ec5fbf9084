//! Errors.

use std::fmt::Display;

use thiserror::Error;
use tokio::{sync::oneshot::error::RecvError, task::JoinError};

/// An error returned by a [`FlushTrigger`](crate::FlushTrigger).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TriggerError<E: Display> {
    /// `start()` was called on a trigger which has already been started.
    #[error("The flush trigger has already been started")]
    AlreadyStarted,

    /// `stop()` was called on a trigger which was never started.
    #[error("The flush trigger has not been started")]
    NotStarted,

    /// The flush action returned an error.
    #[error("The flush action failed")]
    FlushFailed(#[source] E),

    /// The flush action panicked.
    #[error("The flush action panicked")]
    Panic,

    /// The flush was cancelled before completion.
    #[error("The flush was cancelled")]
    Cancelled,

    /// The background worker went away before reporting how shutdown went.
    ///
    /// Unrecoverable.
    #[error("Lost contact with the flush worker: {0}")]
    WorkerGone(#[from] RecvError),
}

/// Result type for trigger operations.
pub type TriggerResult<T, E> = std::result::Result<T, TriggerError<E>>;

impl<E> TriggerError<E>
where
    E: Display,
{
    /// Get the inner error for flush failures, otherwise self.
    pub fn inner(self) -> Result<E, Self> {
        match self {
            TriggerError::FlushFailed(source) => Ok(source),
            _ => Err(self),
        }
    }
}

pub(crate) fn join_error_to_trigger_error<E: Display>(join_err: JoinError) -> TriggerError<E> {
    if join_err.is_cancelled() {
        TriggerError::Cancelled
    } else {
        TriggerError::Panic
    }
}

/// An invalid [`TriggerConfig`](crate::TriggerConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The batch size was zero.
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    /// The interval was zero.
    #[error("interval must be greater than zero")]
    ZeroInterval,
}
