use std::{thread, time::Duration};

use flush_trigger::FlushCause;
use rstest::rstest;
use tokio::time::Instant;

use crate::{
    assert_elapsed,
    types::{RecordingAction, config, trigger},
};

/// Given a batch size of 5
/// When we record five arrivals in quick succession
/// Then there should be a single flush of all five, and no interval flush afterwards
#[tokio::test]
async fn full_batch_flushes_once() {
    tokio::time::pause();

    let action = RecordingAction::new();
    let trigger = trigger("full_batch_flushes_once", config(5, 1000, 100), action.clone());
    trigger.start().unwrap();

    for _ in 0..5 {
        trigger.on_insert();
    }

    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(action.claimed(), vec![(FlushCause::Threshold, 5)]);
    assert_eq!(trigger.pending(), 0);
}

/// Given a batch size of 10
/// When we record fewer arrivals than that
/// Then nothing should be flushed before the interval elapses
#[tokio::test]
async fn partial_batch_waits_for_interval() {
    tokio::time::pause();

    let action = RecordingAction::new();
    let trigger = trigger(
        "partial_batch_waits_for_interval",
        config(10, 1000, 0),
        action.clone(),
    );
    trigger.start().unwrap();

    for _ in 0..9 {
        trigger.on_insert();
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(action.flushes().is_empty());
    assert_eq!(trigger.pending(), 9);
}

/// Given many threads recording arrivals at the same time
/// When the trigger is stopped
/// Then every arrival has been flushed exactly once, in full batches plus a final remainder
#[tokio::test]
#[rstest]
#[timeout(Duration::from_secs(5))]
async fn concurrent_arrivals_are_flushed_exactly_once(
    #[values(1, 7, 100)] batch_size: usize,
) {
    let threads = 8;
    let per_thread = 125;
    let total = threads * per_thread;

    let action = RecordingAction::new();
    let trigger = trigger(
        "concurrent_arrivals_are_flushed_exactly_once",
        config(batch_size, 60_000, 0),
        action.clone(),
    );
    trigger.start().unwrap();

    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                for _ in 0..per_thread {
                    trigger.on_insert();
                }
            });
        }
    });

    trigger.stop().await.unwrap();

    let flushes = action.claimed();

    let threshold_flushes: Vec<_> = flushes
        .iter()
        .filter(|(cause, _)| *cause == FlushCause::Threshold)
        .collect();
    assert!(
        threshold_flushes.len() <= total / batch_size,
        "{} threshold flushes for {} arrivals",
        threshold_flushes.len(),
        total
    );
    for (_, claimed) in &threshold_flushes {
        assert!(*claimed >= batch_size, "claimed a partial batch: {claimed}");
    }

    let drains = flushes
        .iter()
        .filter(|(cause, _)| *cause == FlushCause::Shutdown)
        .count();
    assert!(drains <= 1);

    let flushed: usize = flushes.iter().map(|(_, claimed)| claimed).sum();
    assert_eq!(flushed, total);
    assert_eq!(trigger.pending(), 0);
}

/// Given a slow flush action
/// When several batches fill up at once
/// Then they are flushed one after another, not concurrently
#[tokio::test]
async fn flushes_run_one_at_a_time() {
    tokio::time::pause();

    let flush_dur = Duration::from_millis(100);

    let action = RecordingAction::new().with_delay(flush_dur);
    let trigger = trigger("flushes_run_one_at_a_time", config(1, 60_000, 0), action.clone());
    trigger.start().unwrap();

    let now = Instant::now();

    trigger.on_insert();
    trigger.on_insert();
    trigger.on_insert();

    // Recording arrivals doesn't wait for any of them.
    assert_elapsed!(now, Duration::ZERO, Duration::from_millis(1));

    trigger.stop().await.unwrap();

    // Each paused-clock sleep can finish up to 1ms late.
    assert_elapsed!(
        now,
        flush_dur * 3,
        Duration::from_millis(1) * 3 + Duration::from_millis(2)
    );
    assert_eq!(
        action.claimed(),
        vec![
            (FlushCause::Threshold, 1),
            (FlushCause::Threshold, 1),
            (FlushCause::Threshold, 1),
        ]
    );
}

/// Given a flush action which fails
/// When batches fill up
/// Then each batch is attempted once and the trigger keeps going
#[tokio::test]
async fn failed_threshold_flush_is_not_retried() {
    tokio::time::pause();

    let action = RecordingAction::new().failing();
    let trigger = trigger(
        "failed_threshold_flush_is_not_retried",
        config(2, 1000, 0),
        action.clone(),
    );
    trigger.start().unwrap();

    trigger.on_insert();
    trigger.on_insert();
    tokio::time::sleep(Duration::from_millis(10)).await;

    trigger.on_insert();
    trigger.on_insert();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(
        action.claimed(),
        vec![(FlushCause::Threshold, 2), (FlushCause::Threshold, 2)]
    );
    assert!(trigger.is_running());
}
