use std::{fmt::Display, sync::Arc};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, instrument::WithSubscriber};

use crate::{
    action::{FlushAction, FlushCause, FlushRequest},
    config::TriggerConfig,
    counter::ArrivalCounter,
    error::TriggerResult,
    interval::{Generation, IntervalTimer},
    supervisor::Supervisor,
};

/// Owns the interval timer and runs every flush, one at a time.
pub(crate) struct Worker<F: FlushAction> {
    trigger_name: String,
    config: TriggerConfig,
    counter: Arc<ArrivalCounter>,
    supervisor: Supervisor<F>,

    /// Used to arm the interval timer.
    msg_tx: mpsc::UnboundedSender<Message>,
    /// Receives threshold flush requests and interval expiries.
    msg_rx: mpsc::UnboundedReceiver<Message>,

    /// Receives requests to shut down.
    shutdown_rx: mpsc::Receiver<ShutdownRequest<F::Error>>,

    timer: IntervalTimer,
}

#[derive(Debug)]
pub(crate) enum Message {
    /// The batch size was reached and `claimed` arrivals were taken from the counter.
    FlushRequested { claimed: usize },
    IntervalElapsed(Generation),
}

/// Carries the result of the final drain back to `stop()`.
pub(crate) struct ShutdownRequest<E: Display>(oneshot::Sender<TriggerResult<(), E>>);

/// A handle to the worker task.
///
/// Used for shutting down the worker and waiting for the final drain.
#[derive(Debug)]
pub(crate) struct WorkerHandle<E: Display> {
    shutdown_tx: mpsc::Sender<ShutdownRequest<E>>,
}

/// Aborts the worker task when dropped.
#[derive(Debug)]
pub(crate) struct WorkerDropGuard {
    handle: JoinHandle<()>,
}

impl<F: FlushAction> Worker<F> {
    pub fn spawn(
        trigger_name: String,
        config: TriggerConfig,
        counter: Arc<ArrivalCounter>,
        action: F,
    ) -> (
        WorkerHandle<F::Error>,
        WorkerDropGuard,
        mpsc::UnboundedSender<Message>,
    ) {
        // Unbounded so that recording an arrival never waits on a slow flush.
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = Worker {
            supervisor: Supervisor::new(trigger_name.clone(), action),
            trigger_name,
            config,
            counter,

            msg_tx: msg_tx.clone(),
            msg_rx,

            shutdown_rx,

            timer: IntervalTimer::new(),
        };

        let handle = tokio::spawn(worker.run().with_current_subscriber());

        (WorkerHandle { shutdown_tx }, WorkerDropGuard { handle }, msg_tx)
    }

    fn arm_interval(&mut self) {
        self.timer
            .arm(self.config.next_delay(), self.msg_tx.clone());
    }

    async fn flush(&mut self, cause: FlushCause, claimed: usize) -> TriggerResult<(), F::Error> {
        self.supervisor
            .flush(FlushRequest::new(cause, claimed))
            .await
    }

    async fn on_flush_requested(&mut self, claimed: usize) {
        // Failures are already logged. Nothing else to do but carry on.
        let _ = self.flush(FlushCause::Threshold, claimed).await;

        // A flush restarts the idle period.
        self.arm_interval();
    }

    async fn on_interval_elapsed(&mut self, generation: Generation) {
        if !self.timer.is_current(generation) {
            debug!(
                "Ignoring a replaced interval check. Trigger: {}",
                self.trigger_name
            );
            return;
        }

        let pending = self.counter.pending();
        debug!(
            "Interval check for '{}': {} arrivals pending",
            self.trigger_name, pending
        );

        if pending > 0 {
            // A threshold flush may have claimed these in the meantime.
            let claimed = self.counter.claim_and_reset();
            if claimed > 0 {
                let _ = self.flush(FlushCause::Interval, claimed).await;
            }
        }

        self.arm_interval();
    }

    async fn shut_down(&mut self, request: ShutdownRequest<F::Error>) {
        info!("Flush trigger '{}' is shutting down", self.trigger_name);

        self.timer.cancel();

        // Stop accepting new requests, but flush any batches which have already been claimed.
        self.msg_rx.close();
        while let Some(msg) = self.msg_rx.recv().await {
            match msg {
                Message::FlushRequested { claimed } => {
                    let _ = self.flush(FlushCause::Threshold, claimed).await;
                }
                Message::IntervalElapsed(_) => {}
            }
        }

        let claimed = self.counter.claim_and_reset();
        let result = if claimed > 0 {
            self.flush(FlushCause::Shutdown, claimed).await
        } else {
            Ok(())
        };

        if request.0.send(result).is_err() {
            debug!(
                "Unable to report the final flush. Receiver deallocated. Trigger: {}",
                self.trigger_name
            );
        }

        // Anyone else who asked has nothing left to wait for.
        self.shutdown_rx.close();
        while let Ok(ShutdownRequest(tx)) = self.shutdown_rx.try_recv() {
            let _ = tx.send(Ok(()));
        }

        info!("Flush trigger '{}' has shut down", self.trigger_name);
    }

    /// Start running the worker event loop.
    async fn run(mut self) {
        info!(
            "Flush trigger '{}' started ({})",
            self.trigger_name, self.config
        );

        self.arm_interval();

        loop {
            tokio::select! {
                biased;

                Some(request) = self.shutdown_rx.recv() => {
                    self.shut_down(request).await;
                    return;
                }

                Some(msg) = self.msg_rx.recv() => {
                    match msg {
                        Message::FlushRequested { claimed } => {
                            self.on_flush_requested(claimed).await;
                        }
                        Message::IntervalElapsed(generation) => {
                            self.on_interval_elapsed(generation).await;
                        }
                    }
                }

                else => return,
            }
        }
    }
}

impl<E: Display> WorkerHandle<E> {
    /// Signal the worker to shut down, and wait for the final drain.
    pub async fn shut_down(&self) -> TriggerResult<(), E> {
        let (tx, rx) = oneshot::channel();
        if self.shutdown_tx.send(ShutdownRequest(tx)).await.is_err() {
            // The receiver has gone away, so the worker has already shut down.
            return Ok(());
        }

        rx.await?
    }
}

impl Drop for WorkerDropGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
