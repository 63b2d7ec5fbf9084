use std::{fmt::Debug, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tracing::{debug, instrument::WithSubscriber};

use crate::worker::Message;

/// Generations are used to handle the case where a timer goes off after it has already been
/// replaced or cancelled.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub(crate) struct Generation(u32);

impl Generation {
    pub(crate) fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// The single scheduled idle check.
///
/// Arming replaces any previous schedule, so at most one check is ever pending.
pub(crate) struct IntervalTimer {
    generation: Generation,
    deadline: Option<Instant>,
    handle: Option<JoinHandle<()>>,
}

impl Debug for IntervalTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let IntervalTimer {
            generation,
            deadline,
            handle,
        } = self;
        f.debug_struct("IntervalTimer")
            .field("generation", &generation)
            .field("deadline", &deadline)
            .field("handle", &handle.is_some())
            .finish()
    }
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self {
            generation: Generation::default(),
            deadline: None,
            handle: None,
        }
    }

    /// Whether `generation` belongs to the currently armed schedule.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    /// Schedule the next check after `delay`, replacing any pending one.
    pub fn arm(&mut self, delay: Duration, tx: mpsc::UnboundedSender<Message>) {
        self.cancel();

        self.generation = self.generation.next();
        let new_deadline = Instant::now() + delay;
        self.deadline = Some(new_deadline);

        let generation = self.generation;
        let new_handle = tokio::spawn(
            async move {
                tokio::time::sleep_until(new_deadline).await;

                if tx.send(Message::IntervalElapsed(generation)).is_err() {
                    // The worker is shutting down and no longer wants interval checks.
                    debug!("An interval elapsed but the worker has shut down");
                }
            }
            .with_current_subscriber(),
        );

        self.handle = Some(new_handle);
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.deadline = None;
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
