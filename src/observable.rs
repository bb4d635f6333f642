// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! A stream of values.
//!
//! An observable represents a stream of values, much like an iterator,
//! but instead of being “pull-based” like an iterator, it is “push-based”:
//! subscribing hands the producer an observer, and the producer calls the
//! observer for every value. Observables here are *cold*: every
//! subscription starts an independent execution of the producer.
//!
//! A producer receives the subscription context and the wrapped observer
//! and may return a teardown that releases whatever it started. The
//! default discipline is blocking backpressure: a producer's call to
//! `on_next` returns only after every downstream operator has finished
//! with the value, so ordering is preserved and nothing buffers
//! implicitly.
//!
//! Three constructors differ only in how deliveries to the observer are
//! synchronized:
//!
//!  * [`Observable::new`]: no synchronization. The baseline for purely
//!    synchronous producers, where concurrent delivery cannot happen.
//!  * [`Observable::serialized`]: every delivery runs under a mutex, so
//!    at most one notification is in flight downstream at any moment. For
//!    producers that emit from multiple threads.
//!  * [`Observable::eventually_safe`]: a try-lock discipline. A value
//!    that arrives while another delivery is in flight is dropped, while
//!    terminal notifications wait for the lock and always arrive. An
//!    explicitly lossy discipline for high-throughput fan-in.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::context::Context;
use crate::error::DynError;
use crate::observer::Observer;
use crate::subscription::{Subscription, Teardown};

/// The producer half of an observable: start one production for the given
/// observer, optionally returning a teardown that stops it.
pub type Producer<T> = dyn Fn(&Context, &Arc<Observer<T>>) -> Option<Teardown> + Send + Sync;

/// How deliveries to the subscribed observer are synchronized.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Discipline {
    Unsafe,
    Serialized,
    EventuallySafe,
}

/// A push-based stream of values; a factory producing a fresh execution
/// per subscription.
pub struct Observable<T> {
    producer: Arc<Producer<T>>,
    discipline: Discipline,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Observable<T> {
        Observable {
            producer: self.producer.clone(),
            discipline: self.discipline,
        }
    }
}

impl<T: 'static> Observable<T> {
    /// Creates an observable from a producer, with no delivery
    /// synchronization. Concurrent delivery is the producer's
    /// responsibility; all purely synchronous producers use this.
    pub fn new(
        producer: impl Fn(&Context, &Arc<Observer<T>>) -> Option<Teardown> + Send + Sync + 'static,
    ) -> Observable<T> {
        Observable {
            producer: Arc::new(producer),
            discipline: Discipline::Unsafe,
        }
    }

    /// Creates an observable whose deliveries are serialized: at any
    /// moment at most one notification is being processed downstream,
    /// even when the producer emits from multiple threads.
    pub fn serialized(
        producer: impl Fn(&Context, &Arc<Observer<T>>) -> Option<Teardown> + Send + Sync + 'static,
    ) -> Observable<T> {
        Observable {
            producer: Arc::new(producer),
            discipline: Discipline::Serialized,
        }
    }

    /// Creates an observable with the drop-on-contention discipline:
    /// values that arrive while another delivery is in flight are lost,
    /// terminal notifications are not. This is an explicitly lossy
    /// discipline and never a substitute for [`Observable::serialized`].
    pub fn eventually_safe(
        producer: impl Fn(&Context, &Arc<Observer<T>>) -> Option<Teardown> + Send + Sync + 'static,
    ) -> Observable<T> {
        Observable {
            producer: Arc::new(producer),
            discipline: Discipline::EventuallySafe,
        }
    }

    /// Converts this observable into one with serialized deliveries; the
    /// production itself is unchanged.
    pub fn serialize(&self) -> Observable<T> {
        Observable {
            producer: self.producer.clone(),
            discipline: Discipline::Serialized,
        }
    }

    /// Subscribes an observer with the background context.
    ///
    /// See [`Observable::subscribe_with`].
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        self.subscribe_with(&Context::background(), observer)
    }

    /// Subscribes an observer and returns the subscription.
    ///
    /// The producer is started immediately with an observer wrapped in
    /// this observable's delivery discipline. A terminal notification
    /// closes the returned subscription, so a producer that finishes
    /// synchronously yields an already-closed subscription. Dropping
    /// values never happens here; cancelling the production is done with
    /// [`Subscription::unsubscribe`].
    pub fn subscribe_with(&self, context: &Context, observer: Observer<T>) -> Subscription {
        let subscription = Subscription::new();
        let target = Arc::new(observer);
        let hooked = Arc::new(closing_observer(&target, &subscription));
        let delivered = match self.discipline {
            Discipline::Unsafe => hooked,
            Discipline::Serialized => Arc::new(serialized_observer(&hooked)),
            Discipline::EventuallySafe => Arc::new(eventually_safe_observer(&hooked)),
        };
        if let Some(teardown) = (self.producer)(context, &delivered) {
            subscription.add(teardown);
        }
        subscription
    }

    /// Applies one operator to this observable.
    ///
    /// An operator is any function from one observable to another; this is
    /// the primitive the `pipe!` and `compose!` macros fold over. The
    /// subscriber context flows through the operator unmodified unless the
    /// operator substitutes it.
    pub fn pipe<U: 'static>(
        &self,
        op: impl FnOnce(Observable<T>) -> Observable<U>,
    ) -> Observable<U> {
        op(self.clone())
    }
}

/// Wraps `target` so that every notification is forwarded verbatim.
pub(crate) fn forwarding_observer<T: 'static>(target: &Arc<Observer<T>>) -> Observer<T> {
    let on_next = {
        let target = target.clone();
        move |context: &Context, item: T| target.on_next_with(context, item)
    };
    let on_error = {
        let target = target.clone();
        move |context: &Context, err: DynError| target.on_error_with(context, err)
    };
    let on_completed = {
        let target = target.clone();
        move |context: &Context| target.on_completed_with(context)
    };
    Observer::with_context(on_next, on_error, on_completed)
}

/// Wraps `target` so that a terminal notification also closes the
/// subscription, which satisfies `Subscription::wait` and releases any
/// attached teardowns.
fn closing_observer<T: 'static>(
    target: &Arc<Observer<T>>,
    subscription: &Subscription,
) -> Observer<T> {
    let on_next = {
        let target = target.clone();
        move |context: &Context, item: T| target.on_next_with(context, item)
    };
    let on_error = {
        let target = target.clone();
        let subscription = subscription.clone();
        move |context: &Context, err: DynError| {
            target.on_error_with(context, err);
            subscription.unsubscribe();
        }
    };
    let on_completed = {
        let target = target.clone();
        let subscription = subscription.clone();
        move |context: &Context| {
            target.on_completed_with(context);
            subscription.unsubscribe();
        }
    };
    Observer::with_context(on_next, on_error, on_completed)
}

/// Wraps `target` behind a mutex: at most one notification in flight.
/// The lock only serializes entry; the wrapped observer's own state
/// machine still decides terminality.
fn serialized_observer<T: 'static>(target: &Arc<Observer<T>>) -> Observer<T> {
    let lock = Arc::new(Mutex::new(()));
    let on_next = {
        let lock = lock.clone();
        let target = target.clone();
        move |context: &Context, item: T| {
            let _guard = lock.lock();
            target.on_next_with(context, item);
        }
    };
    let on_error = {
        let lock = lock.clone();
        let target = target.clone();
        move |context: &Context, err: DynError| {
            let _guard = lock.lock();
            target.on_error_with(context, err);
        }
    };
    let on_completed = {
        let target = target.clone();
        move |context: &Context| {
            let _guard = lock.lock();
            target.on_completed_with(context);
        }
    };
    Observer::with_context(on_next, on_error, on_completed)
}

/// Wraps `target` behind a try-lock: contended values are dropped,
/// terminal notifications block for the lock and are always delivered.
fn eventually_safe_observer<T: 'static>(target: &Arc<Observer<T>>) -> Observer<T> {
    let lock = Arc::new(Mutex::new(()));
    let on_next = {
        let lock = lock.clone();
        let target = target.clone();
        move |context: &Context, item: T| match lock.try_lock() {
            Some(_guard) => target.on_next_with(context, item),
            None => trace!("value dropped under contention"),
        }
    };
    let on_error = {
        let lock = lock.clone();
        let target = target.clone();
        move |context: &Context, err: DynError| {
            let _guard = lock.lock();
            target.on_error_with(context, err);
        }
    };
    let on_completed = {
        let target = target.clone();
        move |context: &Context| {
            let _guard = lock.lock();
            target.on_completed_with(context);
        }
    };
    Observer::with_context(on_next, on_error, on_completed)
}
