use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts arrivals since the last claim.
///
/// The counter is only ever drained by swapping it with zero, so an arrival recorded while a
/// flush is being decided is either part of the claimed batch or left for the next one. It is
/// never absorbed silently.
#[derive(Debug, Default)]
pub struct ArrivalCounter(AtomicUsize);

impl ArrivalCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one arrival and return the new count.
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Atomically take the current count, leaving zero behind.
    pub fn claim_and_reset(&self) -> usize {
        self.0.swap(0, Ordering::AcqRel)
    }

    /// Take the current count only if it is at least `min`.
    ///
    /// Returns zero, and leaves the counter untouched, when another caller has already claimed
    /// the batch.
    pub fn claim_if_at_least(&self, min: usize) -> usize {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count >= min).then_some(0)
            })
            .unwrap_or(0)
    }

    /// Give back `claimed` arrivals which could not be flushed.
    pub fn restore(&self, claimed: usize) {
        self.0.fetch_add(claimed, Ordering::AcqRel);
    }

    /// The number of arrivals not yet claimed.
    pub fn pending(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}
