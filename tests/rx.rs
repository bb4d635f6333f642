// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use ripple::{Error, Observable, Observer, Subscription};

// Observer tests

#[test]
fn observer_delivers_at_most_one_terminal() {
    let nexts = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let completions = Arc::new(AtomicUsize::new(0));

    let observer = {
        let nexts = nexts.clone();
        let errors = errors.clone();
        let completions = completions.clone();
        Observer::new(
            move |_x: u8| {
                nexts.fetch_add(1, Ordering::SeqCst);
            },
            move |_err| {
                errors.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                completions.fetch_add(1, Ordering::SeqCst);
            },
        )
    };

    observer.on_next(1);
    observer.on_error(Error::InvalidStep.shared());
    // Everything after the terminal must be discarded.
    observer.on_next(2);
    observer.on_error(Error::InvalidStep.shared());
    observer.on_completed();

    assert_eq!(nexts.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(completions.load(Ordering::SeqCst), 0);
    assert!(observer.is_errored());
    assert!(!observer.is_active());
}

#[test]
fn observer_error_and_completed_are_exclusive() {
    let errors = Arc::new(AtomicUsize::new(0));
    let completions = Arc::new(AtomicUsize::new(0));

    let observer = {
        let errors = errors.clone();
        let completions = completions.clone();
        Observer::<u8>::new(
            |_x| {},
            move |_err| {
                errors.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                completions.fetch_add(1, Ordering::SeqCst);
            },
        )
    };

    observer.on_completed();
    observer.on_error(Error::InvalidStep.shared());

    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert!(observer.is_completed());
}

#[test]
fn observer_contains_panicking_next_callback() {
    let received = Arc::new(Mutex::new(None));

    let observer = {
        let received = received.clone();
        Observer::new(
            |_x: u8| panic!("next exploded"),
            move |err| *received.lock() = Some(err),
            || panic!("should not complete"),
        )
    };

    // The panic must not escape to the caller.
    observer.on_next(1);

    let err = received.lock().clone().expect("panic routed as error");
    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::CallbackPanic("next exploded".to_string()))
    );
    assert!(observer.is_errored());

    // And the observer is terminal now, so further values are discarded
    // without invoking the panicking callback again.
    observer.on_next(2);
}

#[test]
fn observer_partial_constructors() {
    let count = Arc::new(AtomicUsize::new(0));
    let next_only = {
        let count = count.clone();
        Observer::from_next(move |_x: u8| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };
    next_only.on_next(1);
    next_only.on_completed();
    next_only.on_next(2);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let completed = Arc::new(AtomicBool::new(false));
    let completed_only = {
        let completed = completed.clone();
        Observer::<u8>::from_completed(move || completed.store(true, Ordering::SeqCst))
    };
    completed_only.on_completed();
    assert!(completed.load(Ordering::SeqCst));

    // The no-op sink accepts anything without effect.
    let sink = Observer::noop();
    sink.on_next(13u8);
    sink.on_error(Error::InvalidCount.shared());
}

// Subscription tests

#[test]
fn subscription_runs_teardowns_in_lifo_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let subscription = Subscription::new();
    for label in ["outer", "middle", "inner"] {
        let order = order.clone();
        subscription.add(move || order.lock().push(label));
    }

    subscription.unsubscribe();

    assert_eq!(*order.lock(), vec!["inner", "middle", "outer"]);
}

#[test]
fn subscription_unsubscribe_is_idempotent() {
    let runs = Arc::new(AtomicUsize::new(0));
    let subscription = Subscription::new();
    {
        let runs = runs.clone();
        subscription.add(move || {
            runs.fetch_add(1, Ordering::SeqCst);
        });
    }

    subscription.unsubscribe();
    subscription.unsubscribe();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(subscription.is_closed());
}

#[test]
fn subscription_add_after_close_runs_immediately() {
    let ran = Arc::new(AtomicBool::new(false));
    let subscription = Subscription::new();
    subscription.unsubscribe();

    let flag = ran.clone();
    subscription.add(move || flag.store(true, Ordering::SeqCst));

    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn subscription_closing_parent_closes_child() {
    let parent = Subscription::new();
    let child = Subscription::new();
    parent.add_child(&child);

    parent.unsubscribe();

    assert!(child.is_closed());
}

#[test]
fn subscription_panicking_teardown_does_not_stop_the_rest() {
    let ran = Arc::new(AtomicBool::new(false));
    let subscription = Subscription::new();
    {
        let ran = ran.clone();
        subscription.add(move || ran.store(true, Ordering::SeqCst));
    }
    subscription.add(|| panic!("teardown exploded"));

    // The panicking teardown runs first (LIFO) and is contained.
    subscription.unsubscribe();

    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn subscription_teardown_runs_once_under_concurrent_unsubscribe() {
    for _ in 0..50 {
        let runs = Arc::new(AtomicUsize::new(0));
        let subscription = Subscription::new();
        {
            let runs = runs.clone();
            subscription.add(move || {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }

        let racers: Vec<_> = (0..4)
            .map(|_| {
                let subscription = subscription.clone();
                thread::spawn(move || subscription.unsubscribe())
            })
            .collect();
        for racer in racers {
            racer.join().unwrap();
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn subscription_wait_blocks_until_closed() {
    let subscription = Subscription::new();
    let closer = {
        let subscription = subscription.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            subscription.unsubscribe();
        })
    };

    subscription.wait();
    assert!(subscription.is_closed());
    closer.join().unwrap();
}

// Observable tests

#[test]
fn synchronous_producer_yields_closed_subscription() {
    let observable = ripple::just(19u8);
    let subscription = observable.subscribe(Observer::noop());
    assert!(subscription.is_closed());
}

#[test]
fn cold_observables_run_once_per_subscription() {
    let productions = Arc::new(AtomicUsize::new(0));
    let observable = {
        let productions = productions.clone();
        Observable::new(move |context, observer| {
            productions.fetch_add(1, Ordering::SeqCst);
            observer.on_next_with(context, 1u8);
            observer.on_next_with(context, 2);
            observer.on_completed_with(context);
            None
        })
    };

    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));
    for received in [&first, &second] {
        let received = received.clone();
        observable.subscribe(Observer::from_next(move |x| received.lock().push(x)));
    }

    assert_eq!(productions.load(Ordering::SeqCst), 2);
    assert_eq!(*first.lock(), vec![1, 2]);
    assert_eq!(*second.lock(), vec![1, 2]);
}

#[test]
fn producer_survives_panicking_subscriber() {
    let produced_past_panic = Arc::new(AtomicBool::new(false));
    let observable = {
        let produced_past_panic = produced_past_panic.clone();
        Observable::new(move |context, observer| {
            observer.on_next_with(context, 1u8);
            // The subscriber panicked on the first value; the producer
            // must not notice.
            produced_past_panic.store(true, Ordering::SeqCst);
            observer.on_next_with(context, 2);
            observer.on_completed_with(context);
            None
        })
    };

    let error = Arc::new(Mutex::new(None));
    let observer = {
        let error = error.clone();
        Observer::new(
            |_x| panic!("subscriber exploded"),
            move |err| *error.lock() = Some(err),
            || panic!("must not complete after a panic"),
        )
    };
    observable.subscribe(observer);

    assert!(produced_past_panic.load(Ordering::SeqCst));
    let err = error.lock().clone().expect("panic surfaced as error");
    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::CallbackPanic("subscriber exploded".to_string()))
    );
}

/// Asserts that deliveries never overlap by flipping a flag on entry and
/// clearing it on exit; an overlapping delivery would observe it set.
fn overlap_detector(
    in_flight: &Arc<AtomicBool>,
    overlapped: &Arc<AtomicBool>,
    count: &Arc<AtomicUsize>,
) -> Observer<u64> {
    let in_flight = in_flight.clone();
    let overlapped = overlapped.clone();
    let count = count.clone();
    Observer::from_next(move |_x| {
        if in_flight.swap(true, Ordering::SeqCst) {
            overlapped.store(true, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_micros(50));
        in_flight.store(false, Ordering::SeqCst);
        count.fetch_add(1, Ordering::SeqCst);
    })
}

fn emit_from_two_threads(context: &ripple::Context, observer: &Arc<Observer<u64>>) {
    let emitters: Vec<_> = (0..2)
        .map(|_| {
            let context = context.clone();
            let observer = observer.clone();
            thread::spawn(move || {
                for x in 0..100 {
                    observer.on_next_with(&context, x);
                }
            })
        })
        .collect();
    for emitter in emitters {
        emitter.join().unwrap();
    }
}

#[test]
fn serialized_observable_never_overlaps_deliveries() {
    let in_flight = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let count = Arc::new(AtomicUsize::new(0));

    let observable = Observable::serialized(|context, observer| {
        emit_from_two_threads(context, observer);
        observer.on_completed_with(context);
        None
    });
    let subscription =
        observable.subscribe(overlap_detector(&in_flight, &overlapped, &count));
    subscription.wait();

    assert!(!overlapped.load(Ordering::SeqCst));
    // Serialized means slow, not lossy: every value arrives.
    assert_eq!(count.load(Ordering::SeqCst), 200);
}

#[test]
fn serialize_operator_makes_unsafe_observable_safe() {
    let in_flight = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let count = Arc::new(AtomicUsize::new(0));

    let observable = Observable::new(|context, observer| {
        emit_from_two_threads(context, observer);
        observer.on_completed_with(context);
        None
    });
    let subscription = observable
        .serialize()
        .subscribe(overlap_detector(&in_flight, &overlapped, &count));
    subscription.wait();

    assert!(!overlapped.load(Ordering::SeqCst));
    assert_eq!(count.load(Ordering::SeqCst), 200);
}

#[test]
fn eventually_safe_observable_drops_contended_values_but_not_terminals() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(AtomicBool::new(false));

    let observable = Observable::eventually_safe(|context, observer| {
        let slow = {
            let context = context.clone();
            let observer = observer.clone();
            thread::spawn(move || observer.on_next_with(&context, 1u8))
        };
        // Give the slow delivery time to take the lock, then try to emit
        // while it is still being processed: this value must be dropped.
        thread::sleep(Duration::from_millis(30));
        observer.on_next_with(context, 2);
        slow.join().unwrap();
        observer.on_completed_with(context);
        None
    });

    let observer = {
        let received = received.clone();
        let completed = completed.clone();
        Observer::new(
            move |x| {
                received.lock().push(x);
                thread::sleep(Duration::from_millis(100));
            },
            |_err| panic!("should not fail"),
            move || completed.store(true, Ordering::SeqCst),
        )
    };
    let subscription = observable.subscribe(observer);
    subscription.wait();

    assert_eq!(*received.lock(), vec![1]);
    assert!(completed.load(Ordering::SeqCst));
}
