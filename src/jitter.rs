use std::time::Duration;

use rand::Rng;

/// The shortest delay ever scheduled, however wide the jitter window.
pub(crate) const MIN_DELAY: Duration = Duration::from_millis(1);

/// Offset `interval` by a uniformly random amount in `[-window, +window]`.
///
/// The lower end is clamped to [`MIN_DELAY`] so a window as wide as `interval` never schedules a
/// check immediately.
pub(crate) fn jittered(interval: Duration, window: Duration) -> Duration {
    if window.is_zero() {
        return interval;
    }

    let lower = interval.saturating_sub(window).max(MIN_DELAY);
    let upper = interval.saturating_add(window).max(lower);

    let span_nanos = u64::try_from((upper - lower).as_nanos()).unwrap_or(u64::MAX);
    let offset = rand::rng().random_range(0..=span_nanos);

    lower + Duration::from_nanos(offset)
}
