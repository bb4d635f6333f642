// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Pipeline composition and the scheduling operators.
//!
//! An operator is a pure function from one observable to another; a
//! pipeline is a left-fold of operators over a source. The
//! [`pipe`](crate::Observable::pipe) method applies a single operator, the
//! [`pipe!`](crate::pipe!) macro folds any number of them, and
//! [`compose!`](crate::compose!) fuses several operators into one.
//!
//! Most operators are synchronous: they forward each value downstream
//! before returning control upstream, which is what gives the library its
//! blocking backpressure. Two operators deliberately break that coupling
//! with a bounded queue:
//!
//!  * [`subscribe_on`] runs the upstream subscription, and therefore its
//!    emissions, on a separate thread. Subscribing downstream returns
//!    immediately.
//!  * [`observe_on`] runs downstream delivery on a separate thread while
//!    the upstream keeps producing wherever it runs.
//!
//! In both cases the queue has a fixed capacity: a full queue blocks the
//! upstream, so producer rate still adapts to consumer rate and memory
//! stays bounded. Order is FIFO and the terminal notification is
//! delivered after every pending value.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::context::Context;
use crate::error::DynError;
use crate::observable::Observable;
use crate::observer::{Notification, Observer};
use crate::subscription::Subscription;

/// Applies `op` to `source`; identical to `source.pipe(op)`.
pub fn pipe<A: 'static, B: 'static>(
    source: &Observable<A>,
    op: impl FnOnce(Observable<A>) -> Observable<B>,
) -> Observable<B> {
    source.pipe(op)
}

/// Folds any number of operators over a source observable, first operator
/// innermost:
///
/// ```ignore
/// let doubled_evens = pipe!(source, keep_even(), scale(2));
/// ```
#[macro_export]
macro_rules! pipe {
    ($source:expr $(, $op:expr)* $(,)?) => {{
        let observable = ::std::clone::Clone::clone(&$source);
        $(let observable = ($op)(observable);)*
        observable
    }};
}

/// Fuses several operators into a single one, applied left to right:
///
/// ```ignore
/// let sixfold = compose!(scale(2), scale(3));
/// let result = source.pipe(sixfold);
/// ```
#[macro_export]
macro_rules! compose {
    ($($op:expr),+ $(,)?) => {
        move |observable| {
            $(let observable = ($op)(observable);)+
            observable
        }
    };
}

/// The operator form of [`Observable::serialize`]: converts any
/// observable into one with serialized deliveries.
pub fn serialize<T: 'static>() -> impl Fn(Observable<T>) -> Observable<T> {
    |source| source.serialize()
}

/// Runs the upstream subscription on a separate thread, bridged to the
/// downstream through a bounded FIFO queue of the given capacity.
///
/// Subscribing returns immediately. Upstream emissions block once the
/// queue is full; a second thread drains the queue and forwards
/// downstream in order. Unsubscribing cancels the upstream and lets both
/// threads wind down; values still queued at that point are discarded.
pub fn subscribe_on<T: Send + Sync + 'static>(
    capacity: usize,
) -> impl Fn(Observable<T>) -> Observable<T> {
    move |source: Observable<T>| {
        Observable::new(move |context, downstream| {
            let (sender, receiver) = bounded(capacity);
            let control = Subscription::new();
            {
                let source = source.clone();
                let context = context.clone();
                let control = control.clone();
                thread::spawn(move || {
                    let child = source.subscribe_with(&context, queue_observer(sender));
                    // If the control was already unsubscribed, add_child
                    // closes the fresh subscription on the spot.
                    control.add_child(&child);
                });
            }
            spawn_forwarder(receiver, downstream.clone());
            Some(Box::new(move || control.unsubscribe()))
        })
    }
}

/// Runs downstream delivery on a separate thread, bridged through a
/// bounded FIFO queue of the given capacity.
///
/// The upstream keeps producing wherever it runs and blocks once the
/// queue is full. The forwarding thread preserves order and delivers the
/// terminal notification after every pending value.
pub fn observe_on<T: Send + Sync + 'static>(
    capacity: usize,
) -> impl Fn(Observable<T>) -> Observable<T> {
    move |source: Observable<T>| {
        Observable::new(move |context, downstream| {
            let (sender, receiver) = bounded(capacity);
            spawn_forwarder(receiver, downstream.clone());
            let child = source.subscribe_with(context, queue_observer(sender));
            Some(Box::new(move || child.unsubscribe()))
        })
    }
}

/// An observer that moves every notification, with its context, into the
/// queue. The send blocks while the queue is full; that is the
/// backpressure carrying over the thread boundary.
fn queue_observer<T: Send + Sync + 'static>(
    sender: Sender<(Context, Notification<T>)>,
) -> Observer<T> {
    let on_next = {
        let sender = sender.clone();
        move |context: &Context, item: T| {
            let _ = sender.send((context.clone(), Notification::Next(item)));
        }
    };
    let on_error = {
        let sender = sender.clone();
        move |context: &Context, err: DynError| {
            let _ = sender.send((context.clone(), Notification::Error(err)));
        }
    };
    let on_completed = move |context: &Context| {
        let _ = sender.send((context.clone(), Notification::Completed));
    };
    Observer::with_context(on_next, on_error, on_completed)
}

/// Drains the queue on its own thread, forwarding to `downstream` in
/// order. Exits after the terminal notification, or when every sender is
/// gone because the upstream was torn down.
fn spawn_forwarder<T: Send + Sync + 'static>(
    receiver: Receiver<(Context, Notification<T>)>,
    downstream: Arc<Observer<T>>,
) {
    thread::spawn(move || {
        while let Ok((context, notification)) = receiver.recv() {
            match notification {
                Notification::Next(item) => downstream.on_next_with(&context, item),
                Notification::Error(err) => {
                    downstream.on_error_with(&context, err);
                    return;
                }
                Notification::Completed => {
                    downstream.on_completed_with(&context);
                    return;
                }
            }
        }
    });
}
