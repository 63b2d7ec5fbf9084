use std::{
    fmt::{self, Display},
    time::Duration,
};

use bon::bon;

use crate::{error::ConfigError, jitter};

/// Controls when a flush is triggered.
///
/// A flush is requested as soon as `batch_size` arrivals have been counted. Independently, the
/// counter is checked every `interval` (give or take `jitter_window`) and anything pending is
/// flushed.
///
/// When many processes flush to the same destination, a non-zero `jitter_window` stops their
/// interval checks from lining up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct TriggerConfig {
    pub(crate) batch_size: usize,
    pub(crate) interval: Duration,
    pub(crate) jitter_window: Duration,
}

#[bon]
impl TriggerConfig {
    #[allow(missing_docs)]
    #[builder]
    pub fn new(
        /// Flush as soon as this many arrivals have been counted. Must be greater than zero.
        batch_size: usize,
        /// Base period between idle checks. Must be greater than zero.
        interval: Duration,
        /// Each check is scheduled up to this much earlier or later than `interval`. A window as
        /// wide as `interval` or wider never schedules a check sooner than one millisecond.
        #[builder(default)]
        jitter_window: Duration,
    ) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(Self {
            batch_size,
            interval,
            jitter_window,
        })
    }

    /// The number of arrivals which triggers an immediate flush.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The base period between idle checks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The maximum random offset applied to each interval.
    pub fn jitter_window(&self) -> Duration {
        self.jitter_window
    }

    /// How long to wait before the next idle check.
    pub(crate) fn next_delay(&self) -> Duration {
        jitter::jittered(self.interval, self.jitter_window)
    }
}

impl Display for TriggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch_size: {}, interval: {:?}, jitter_window: {:?}",
            self.batch_size, self.interval, self.jitter_window
        )
    }
}
