//! WaitSet attach/wait behavior.

mod common;

use common::{PortEvent, TestPort};
use flint_dispatch::{WaitSet, WaitSetError, WaitSetImpl};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn small_wait_set() -> WaitSetImpl<4> {
    WaitSetImpl::<4>::new().expect("failed to set up wait set")
}

fn count_hits(port: &TestPort) {
    port.hits
        .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
}

#[test]
fn timed_wait_with_no_attachments_returns_empty_after_the_timeout() {
    let wait_set = small_wait_set();

    let start = Instant::now();
    let fired = wait_set.timed_wait(Duration::from_millis(50));
    let elapsed = start.elapsed();

    assert!(fired.is_empty());
    assert!(elapsed >= Duration::from_millis(40), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "returned far too late: {elapsed:?}");
}

#[test]
fn a_triggered_event_is_reported_with_identity_and_user_id() {
    let wait_set = small_wait_set();
    let port = TestPort::new();
    let slot = wait_set
        .attach_event(&port, PortEvent::DataReceived, 42, count_hits)
        .unwrap();

    port.raise(PortEvent::DataReceived);

    let fired = wait_set.wait();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].slot_id(), slot);
    assert_eq!(fired[0].user_id(), 42);
    assert!(fired[0].does_originate_from(&*port));

    let stranger = TestPort::new();
    assert!(!fired[0].does_originate_from(&*stranger));
}

#[test]
fn the_stored_callback_can_be_invoked_manually() {
    let wait_set = small_wait_set();
    let port = TestPort::new();
    wait_set
        .attach_event(&port, PortEvent::DataReceived, 0, count_hits)
        .unwrap();

    port.raise(PortEvent::DataReceived);
    let fired = wait_set.wait();
    assert_eq!(port.hit_count(), 0);

    fired[0].call();
    fired[0].call();
    assert_eq!(port.hit_count(), 2);
}

#[test]
fn unsatisfied_conditions_are_filtered_out() {
    let wait_set = small_wait_set();
    let port = TestPort::new();
    wait_set
        .attach_event(&port, PortEvent::DataReceived, 0, count_hits)
        .unwrap();

    // The wakeup arrives but the condition behind it no longer holds.
    port.set_satisfied(false);
    port.raise(PortEvent::DataReceived);

    assert!(wait_set.timed_wait(Duration::from_millis(50)).is_empty());

    // Once the condition holds again, the next trigger is delivered.
    port.set_satisfied(true);
    port.raise(PortEvent::DataReceived);
    assert_eq!(wait_set.timed_wait(Duration::from_secs(5)).len(), 1);
}

#[test]
fn batches_come_back_in_ascending_slot_order() {
    let wait_set = small_wait_set();
    let ports: Vec<_> = (0..3).map(|_| TestPort::new()).collect();
    let mut slots = Vec::new();
    for port in &ports {
        slots.push(
            wait_set
                .attach_event(port, PortEvent::DataReceived, 0, count_hits)
                .unwrap(),
        );
    }

    // Trigger in reverse attachment order.
    for port in ports.iter().rev() {
        port.raise(PortEvent::DataReceived);
    }

    let fired = wait_set.wait();
    let fired_slots: Vec<_> = fired.iter().map(|info| info.slot_id()).collect();
    assert_eq!(fired_slots, slots);
}

#[test]
fn capacity_is_conserved_across_attach_and_detach() {
    let wait_set = small_wait_set();
    assert_eq!(wait_set.capacity(), 4);

    let ports: Vec<_> = (0..4).map(|_| TestPort::new()).collect();
    for port in &ports {
        wait_set
            .attach_event(port, PortEvent::DataReceived, 0, count_hits)
            .unwrap();
    }
    assert_eq!(wait_set.size(), 4);

    let extra = TestPort::new();
    assert_eq!(
        wait_set.attach_event(&extra, PortEvent::DataReceived, 0, count_hits),
        Err(WaitSetError::WaitSetFull)
    );
    assert_eq!(wait_set.size(), 4);

    wait_set.detach_event(&*ports[0], PortEvent::DataReceived);
    assert_eq!(wait_set.size(), 3);
    wait_set
        .attach_event(&extra, PortEvent::DataReceived, 0, count_hits)
        .unwrap();
    assert_eq!(wait_set.size(), 4);
}

#[test]
fn duplicate_attach_is_rejected() {
    let wait_set = small_wait_set();
    let port = TestPort::new();
    wait_set
        .attach_event(&port, PortEvent::DataReceived, 0, count_hits)
        .unwrap();
    assert_eq!(
        wait_set.attach_event(&port, PortEvent::DataReceived, 1, count_hits),
        Err(WaitSetError::AlreadyAttached)
    );
}

#[test]
fn mark_for_destruction_unblocks_a_waiting_thread() {
    let wait_set = Arc::new(WaitSet::new().expect("failed to set up wait set"));

    let blocked = {
        let wait_set = Arc::clone(&wait_set);
        std::thread::spawn(move || wait_set.wait())
    };
    std::thread::sleep(Duration::from_millis(50));
    wait_set.mark_for_destruction();

    assert!(blocked.join().unwrap().is_empty());

    // Every wait afterwards returns empty without blocking.
    let start = Instant::now();
    assert!(wait_set.wait().is_empty());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn detached_events_are_not_reported_even_if_already_fired() {
    let wait_set = small_wait_set();
    let port = TestPort::new();
    wait_set
        .attach_event(&port, PortEvent::DataReceived, 0, count_hits)
        .unwrap();

    port.raise(PortEvent::DataReceived);
    wait_set.detach_event(&*port, PortEvent::DataReceived);

    // The flag fired before the detach, but the slot is gone; nothing to
    // report.
    assert!(wait_set.timed_wait(Duration::from_millis(50)).is_empty());
}
