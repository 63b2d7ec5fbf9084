//! Decide when to flush a batch: after enough arrivals, or after an idle interval.
//!
//! A producer records each arrival (e.g. each row inserted into a buffer) with
//! [`FlushTrigger::on_insert()`]. The trigger does not hold the arrivals themselves. It only
//! counts them, and runs a caller-supplied [`FlushAction`] when:
//!
//! - the count reaches the configured batch size, or
//! - the idle interval elapses with at least one arrival pending.
//!
//! Each interval is randomly jittered so that many processes flushing to the same destination do
//! not all do so at once.
//!
//! Arrivals are claimed atomically, so two triggers racing for the same batch never both flush it,
//! and an arrival recorded during a flush is never lost. Flushes run one at a time on a background
//! worker task. Stopping the trigger flushes whatever is left and reports whether that worked.
//!
//! See the README for an example.

#![deny(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

mod action;
mod config;
mod counter;
pub mod error;
mod interval;
mod jitter;
mod supervisor;
mod trigger;
mod worker;

pub use action::{FlushAction, FlushCause, FlushRequest};
pub use config::TriggerConfig;
pub use counter::ArrivalCounter;
pub use error::{ConfigError, TriggerError};
pub use trigger::FlushTrigger;
