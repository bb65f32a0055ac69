//! In-process behavior of the Notifier/Waiter pair.

use flint_sync::{ConditionArena, Notifier, Waiter};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn arena() -> Arc<ConditionArena> {
    Arc::new(ConditionArena::in_process().expect("failed to set up condition"))
}

#[test]
fn notify_then_wait_returns_the_index() {
    let cond = arena();
    let waiter = Waiter::new(Arc::clone(&cond));
    Notifier::new(Arc::clone(&cond), 5).notify();

    assert_eq!(waiter.wait(), vec![5]);
}

#[test]
fn batch_is_ascending_regardless_of_trigger_order() {
    let cond = arena();
    let waiter = Waiter::new(Arc::clone(&cond));
    for index in [9, 2, 120, 40] {
        Notifier::new(Arc::clone(&cond), index).notify();
    }

    assert_eq!(waiter.wait(), vec![2, 9, 40, 120]);
}

#[test]
fn repeated_notifies_collapse_to_one_observation() {
    let cond = arena();
    let waiter = Waiter::new(Arc::clone(&cond));
    let notifier = Notifier::new(Arc::clone(&cond), 3);
    notifier.notify();
    notifier.notify();
    notifier.notify();

    assert_eq!(waiter.wait(), vec![3]);
    // The surplus semaphore counts from the collapsed notifies must not
    // surface as spurious wakeups.
    assert!(waiter.timed_wait(Duration::from_millis(20)).is_empty());
}

#[test]
fn out_of_range_notify_is_dropped() {
    let cond = arena();
    let waiter = Waiter::new(Arc::clone(&cond));
    Notifier::new(Arc::clone(&cond), u64::MAX).notify();
    Notifier::new(Arc::clone(&cond), 128).notify();

    assert!(waiter.timed_wait(Duration::from_millis(20)).is_empty());
}

#[test]
fn timed_wait_with_nothing_fired_returns_after_the_timeout() {
    let cond = arena();
    let waiter = Waiter::new(Arc::clone(&cond));

    let start = Instant::now();
    let fired = waiter.timed_wait(Duration::from_millis(50));
    let elapsed = start.elapsed();

    assert!(fired.is_empty());
    assert!(elapsed >= Duration::from_millis(40), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "returned far too late: {elapsed:?}");
}

#[test]
fn timed_wait_returns_early_when_an_event_fires() {
    let cond = arena();
    let waiter = Waiter::new(Arc::clone(&cond));
    Notifier::new(Arc::clone(&cond), 7).notify();

    let start = Instant::now();
    assert_eq!(waiter.timed_wait(Duration::from_secs(5)), vec![7]);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn destroy_is_idempotent_and_makes_every_wait_nonblocking() {
    let cond = arena();
    let waiter = Waiter::new(Arc::clone(&cond));
    waiter.destroy();
    waiter.destroy();

    assert!(waiter.wait().is_empty());
    assert!(waiter.wait().is_empty());
    assert!(waiter.timed_wait(Duration::from_secs(5)).is_empty());
}

#[test]
fn destroy_unblocks_a_wait_already_in_flight() {
    let cond = arena();
    let waiter = Arc::new(Waiter::new(Arc::clone(&cond)));

    let blocked = {
        let waiter = Arc::clone(&waiter);
        std::thread::spawn(move || waiter.wait())
    };
    // Give the waiter time to actually block on the semaphore.
    std::thread::sleep(Duration::from_millis(50));
    waiter.destroy();

    assert!(blocked.join().unwrap().is_empty());
}

#[test]
fn destroy_wins_even_with_a_pending_notification() {
    let cond = arena();
    let waiter = Waiter::new(Arc::clone(&cond));
    Notifier::new(Arc::clone(&cond), 1).notify();
    waiter.destroy();

    assert!(waiter.wait().is_empty());
}

#[test]
fn concurrent_destroy_and_wait_never_hang() {
    for _ in 0..50 {
        let cond = arena();
        let waiter = Arc::new(Waiter::new(Arc::clone(&cond)));

        let threads: Vec<_> = (0..3)
            .map(|_| {
                let waiter = Arc::clone(&waiter);
                std::thread::spawn(move || {
                    waiter.destroy();
                })
            })
            .chain(std::iter::once({
                let waiter = Arc::clone(&waiter);
                std::thread::spawn(move || {
                    let _ = waiter.wait();
                })
            }))
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }
        // Once destroy has been observed anywhere, later waits are empty
        // and non-blocking.
        assert!(waiter.wait().is_empty());
    }
}
