use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use flush_trigger::{FlushAction, FlushCause, FlushRequest, FlushTrigger, TriggerConfig};

/// Records every flush it is asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingAction {
    flushes: Arc<Mutex<Vec<FlushRequest>>>,
    delay: Duration,
    fail: bool,
    panic: bool,
}

impl RecordingAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn flushes(&self) -> Vec<FlushRequest> {
        self.flushes.lock().unwrap().clone()
    }

    pub fn claimed(&self) -> Vec<(FlushCause, usize)> {
        self.flushes()
            .into_iter()
            .map(|request| (request.cause, request.claimed))
            .collect()
    }
}

impl FlushAction for RecordingAction {
    type Error = String;

    async fn flush(&self, request: FlushRequest) -> Result<(), String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.flushes.lock().unwrap().push(request);

        if self.panic {
            panic!("flush of {} arrivals panicked", request.claimed);
        }
        if self.fail {
            Err(format!("unable to flush {} arrivals", request.claimed))
        } else {
            Ok(())
        }
    }
}

pub fn config(batch_size: usize, interval_ms: u64, jitter_ms: u64) -> TriggerConfig {
    TriggerConfig::builder()
        .batch_size(batch_size)
        .interval(Duration::from_millis(interval_ms))
        .jitter_window(Duration::from_millis(jitter_ms))
        .build()
        .unwrap()
}

pub fn trigger(
    name: &str,
    config: TriggerConfig,
    action: RecordingAction,
) -> FlushTrigger<RecordingAction> {
    FlushTrigger::builder()
        .name(name)
        .config(config)
        .action(action)
        .build()
}

/// A [FlushTrigger] should be cloneable, even when the action's error is not.
#[derive(Clone)]
#[allow(unused)]
struct CanDeriveClone {
    trigger: FlushTrigger<ActionWithNonCloneableError>,
}

#[derive(Clone)]
struct ActionWithNonCloneableError;

#[derive(Debug)]
struct NotCloneable;

impl std::fmt::Display for NotCloneable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("not cloneable")
    }
}

impl FlushAction for ActionWithNonCloneableError {
    type Error = NotCloneable;

    async fn flush(&self, _request: FlushRequest) -> Result<(), NotCloneable> {
        Ok(())
    }
}
