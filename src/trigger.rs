use std::{
    fmt::{Debug, Display},
    future::Future,
    sync::{Arc, OnceLock},
};

use bon::bon;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, instrument::WithSubscriber, warn};

use crate::{
    action::FlushAction,
    config::TriggerConfig,
    counter::ArrivalCounter,
    error::{TriggerError, TriggerResult},
    worker::{Message, Worker, WorkerDropGuard, WorkerHandle},
};

/// Decides when to flush.
///
/// Counts arrivals recorded with [`on_insert()`](Self::on_insert) and runs the [`FlushAction`]
/// as soon as the batch size is reached, or when the interval elapses with anything pending. A
/// background worker task runs every flush, so the action never runs concurrently with itself.
///
/// Cheap to clone. Cloned instances share the same counter and background worker.
///
/// ## Lifecycle
///
/// A new trigger is stopped: arrivals are counted but nothing is flushed until
/// [`start()`](Self::start). [`stop()`](Self::stop) flushes whatever is left and is final.
///
/// ## Drop
///
/// When the last instance of a running `FlushTrigger` is dropped, the worker task will be aborted
/// (ungracefully shut down) and any pending arrivals are never flushed.
///
/// If you want to shut down gracefully, call [`FlushTrigger::stop()`].
pub struct FlushTrigger<F: FlushAction> {
    inner: Arc<Inner<F>>,
}

struct Inner<F: FlushAction> {
    name: String,
    config: TriggerConfig,
    counter: Arc<ArrivalCounter>,
    action: F,
    running: OnceLock<Running<F::Error>>,
}

struct Running<E: Display> {
    msg_tx: mpsc::UnboundedSender<Message>,
    worker: WorkerHandle<E>,
    _worker_guard: WorkerDropGuard,
}

#[bon]
impl<F: FlushAction> FlushTrigger<F> {
    /// Create a new, stopped, flush trigger.
    #[builder]
    pub fn new(name: impl Into<String>, config: TriggerConfig, action: F) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                config,
                counter: Arc::new(ArrivalCounter::new()),
                action,
                running: OnceLock::new(),
            }),
        }
    }

    /// Start the background worker and arm the interval timer.
    ///
    /// Must be called from within a Tokio runtime. A trigger can only be started once.
    pub fn start(&self) -> TriggerResult<(), F::Error> {
        let mut started = false;

        self.inner.running.get_or_init(|| {
            started = true;

            let (worker, worker_guard, msg_tx) = Worker::spawn(
                self.inner.name.clone(),
                self.inner.config,
                Arc::clone(&self.inner.counter),
                self.inner.action.clone(),
            );

            Running {
                msg_tx,
                worker,
                _worker_guard: worker_guard,
            }
        });

        if started {
            Ok(())
        } else {
            Err(TriggerError::AlreadyStarted)
        }
    }

    /// Record one arrival.
    ///
    /// Never blocks. If this arrival completes a batch, the batch is claimed and handed to the
    /// background worker for flushing.
    pub fn on_insert(&self) {
        let batch_size = self.inner.config.batch_size;

        if self.inner.counter.increment() < batch_size {
            return;
        }

        let Some(running) = self.inner.running.get() else {
            return;
        };
        if running.msg_tx.is_closed() {
            return;
        }

        // Concurrent callers may all see the threshold crossed. Only one of them gets the batch.
        let claimed = self.inner.counter.claim_if_at_least(batch_size);
        if claimed == 0 {
            return;
        }

        debug!(
            "Flush trigger '{}' reached {} arrivals, requesting flush",
            self.inner.name, claimed
        );

        request_flush(
            &self.inner.name,
            &running.msg_tx,
            &self.inner.counter,
            claimed,
        );
    }

    /// Stop the interval timer and flush anything still pending.
    ///
    /// Waits for the final flush. Its failure, if any, is returned here: it is the last chance to
    /// notice that arrivals were not flushed. Stopping an already stopped trigger does nothing.
    pub async fn stop(&self) -> TriggerResult<(), F::Error> {
        let running = self
            .inner
            .running
            .get()
            .ok_or(TriggerError::NotStarted)?;

        running.worker.shut_down().await
    }

    /// Stop this trigger once `signal` completes.
    ///
    /// Use this to tie the trigger to process shutdown, e.g. with `tokio::signal::ctrl_c()`. The
    /// returned handle yields the result of [`stop()`](Self::stop).
    pub fn stop_on<S>(&self, signal: S) -> JoinHandle<TriggerResult<(), F::Error>>
    where
        S: Future + Send + 'static,
    {
        let trigger = self.clone();

        tokio::spawn(
            async move {
                signal.await;
                info!(
                    "Shutdown signal received for flush trigger '{}'",
                    trigger.name()
                );
                trigger.stop().await
            }
            .with_current_subscriber(),
        )
    }

    /// Whether the background worker is accepting flush requests.
    pub fn is_running(&self) -> bool {
        self.inner
            .running
            .get()
            .is_some_and(|running| !running.msg_tx.is_closed())
    }

    /// The number of arrivals not yet claimed for a flush.
    pub fn pending(&self) -> usize {
        self.inner.counter.pending()
    }

    /// The name used in logs and traces.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The trigger's configuration.
    pub fn config(&self) -> TriggerConfig {
        self.inner.config
    }
}

/// Hand a claimed batch to the worker.
///
/// The worker may have stopped between the running check and the claim. The batch then goes back
/// to the counter so it still shows as pending.
fn request_flush(
    name: &str,
    msg_tx: &mpsc::UnboundedSender<Message>,
    counter: &ArrivalCounter,
    claimed: usize,
) {
    if msg_tx.send(Message::FlushRequested { claimed }).is_err() {
        counter.restore(claimed);
        warn!(
            "Flush trigger '{}' stopped before {} claimed arrivals could be flushed",
            name, claimed
        );
    }
}

impl<F: FlushAction> Clone for FlushTrigger<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: FlushAction> Debug for FlushTrigger<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushTrigger")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("[derived] pending", &self.pending())
            .field("[derived] is_running", &self.is_running())
            .finish()
    }
}
