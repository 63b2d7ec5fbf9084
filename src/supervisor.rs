use futures::FutureExt;
use tracing::{debug, error, instrument::WithSubscriber, span, Instrument, Level};

use crate::{
    action::{FlushAction, FlushRequest},
    error::{join_error_to_trigger_error, TriggerError, TriggerResult},
};

/// Runs the flush action and reports how it went.
///
/// Failures are logged here and returned. Whether they go any further is up to the caller.
#[derive(Debug)]
pub(crate) struct Supervisor<F: FlushAction> {
    trigger_name: String,
    action: F,
}

impl<F: FlushAction> Supervisor<F> {
    pub fn new(trigger_name: String, action: F) -> Self {
        Self {
            trigger_name,
            action,
        }
    }

    pub async fn flush(&self, request: FlushRequest) -> TriggerResult<(), F::Error> {
        let span = span!(Level::INFO, "flush batch",
            trigger.name = self.trigger_name.as_str(),
            flush.cause = %request.cause,
            // Convert to u64 so tracing will treat this as an integer instead of a string.
            flush.claimed = request.claimed as u64,
        );

        let action = self.action.clone();

        // Spawn a task so we can catch panics.
        let result = tokio::spawn(
            async move { action.flush(request).await }
                .instrument(span.clone())
                .with_current_subscriber(),
        )
        .map(|joined| {
            joined
                .map_err(join_error_to_trigger_error)
                .and_then(|r| r.map_err(TriggerError::FlushFailed))
        })
        .await;

        span.in_scope(|| match &result {
            Ok(()) => debug!("Flushed {} arrivals", request.claimed),
            Err(err) => error!(
                "Flush trigger '{}' failed to flush {} arrivals ({}): {}",
                self.trigger_name, request.claimed, request.cause, err
            ),
        });

        result
    }
}
