use std::{
    fmt::{self, Debug, Display},
    future::Future,
};

/// Flush whatever the caller has buffered.
///
/// The trigger never runs two flushes for the same instance at once. It does not retry a failed
/// flush; retries, if any, are the action's own business.
///
/// Should be cheap to clone.
pub trait FlushAction: 'static + Send + Sync + Clone {
    /// The error type that can be returned when flushing.
    type Error: 'static + Send + Display + Debug;

    /// Flush the batch described by `request`.
    ///
    /// The request is informational: the claimed count tells the action how many arrivals were
    /// counted, not which ones.
    fn flush(&self, request: FlushRequest) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Describes the batch being flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct FlushRequest {
    /// What caused the flush.
    pub cause: FlushCause,
    /// How many arrivals were claimed for this flush. Always greater than zero.
    pub claimed: usize,
}

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushCause {
    /// The batch size was reached.
    Threshold,
    /// The interval elapsed with arrivals pending.
    Interval,
    /// The trigger was stopped with arrivals pending.
    Shutdown,
}

impl FlushRequest {
    pub(crate) fn new(cause: FlushCause, claimed: usize) -> Self {
        debug_assert!(claimed > 0, "should never flush an empty batch");
        Self { cause, claimed }
    }
}

impl Display for FlushCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlushCause::Threshold => "threshold",
            FlushCause::Interval => "interval",
            FlushCause::Shutdown => "shutdown",
        })
    }
}
