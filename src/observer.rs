// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Observers consume the values that observables produce.
//!
//! An observer receives zero or more *next* notifications, optionally
//! followed by exactly one terminal notification: *error* or *completed*.
//! After a terminal notification it is guaranteed that none of the
//! callbacks run again, no matter how many threads keep delivering. That
//! guarantee is the heart of the kernel: the observer's status is a single
//! atomic word, and the error-versus-completed race is decided by one
//! compare-and-swap, never by a lock held around user code.
//!
//! Panics in the user's next callback do not escape to the producer: the
//! payload is caught and routed through the error callback as
//! [`Error::CallbackPanic`](crate::error::Error::CallbackPanic), unless a
//! terminal notification won the race first.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{panic_error, panic_message, DynError};

/// A single notification on a stream.
///
/// `Error` and `Completed` are terminal: no notification follows them.
#[derive(Clone, Debug)]
pub enum Notification<T> {
    /// A value.
    Next(T),
    /// The stream failed. Terminal.
    Error(DynError),
    /// The stream ended normally. Terminal.
    Completed,
}

const ACTIVE: u8 = 0;
const ERRORED: u8 = 1;
const COMPLETED: u8 = 2;

type NextFn<T> = Box<dyn Fn(&Context, T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&Context, DynError) + Send + Sync>;
type CompletedFn = Box<dyn Fn(&Context) + Send + Sync>;

/// A consumer of notifications with a terminality state machine.
///
/// Observers are built from a callback triple; each callback is optional
/// through the partial constructors. Every delivery operation exists in a
/// plain form (sugar for the background context) and a context-carrying
/// `_with` form; the `_with` forms are the authoritative contract.
pub struct Observer<T> {
    status: AtomicU8,
    next: NextFn<T>,
    error: ErrorFn,
    completed: CompletedFn,
}

impl<T: 'static> Observer<T> {
    /// Creates an observer from a context-carrying callback triple.
    pub fn with_context(
        next: impl Fn(&Context, T) + Send + Sync + 'static,
        error: impl Fn(&Context, DynError) + Send + Sync + 'static,
        completed: impl Fn(&Context) + Send + Sync + 'static,
    ) -> Observer<T> {
        Observer {
            status: AtomicU8::new(ACTIVE),
            next: Box::new(next),
            error: Box::new(error),
            completed: Box::new(completed),
        }
    }

    /// Creates an observer from a callback triple that ignores the context.
    pub fn new(
        next: impl Fn(T) + Send + Sync + 'static,
        error: impl Fn(DynError) + Send + Sync + 'static,
        completed: impl Fn() + Send + Sync + 'static,
    ) -> Observer<T> {
        Observer::with_context(
            move |_context, item| next(item),
            move |_context, err| error(err),
            move |_context| completed(),
        )
    }

    /// An observer that handles values only; failures and completion are
    /// silently discarded.
    pub fn from_next(next: impl Fn(T) + Send + Sync + 'static) -> Observer<T> {
        Observer::new(next, |_err| {}, || {})
    }

    /// An observer that handles failures only.
    pub fn from_error(error: impl Fn(DynError) + Send + Sync + 'static) -> Observer<T> {
        Observer::new(|_item| {}, error, || {})
    }

    /// An observer that handles completion only.
    pub fn from_completed(completed: impl Fn() + Send + Sync + 'static) -> Observer<T> {
        Observer::new(|_item| {}, |_err| {}, completed)
    }

    /// An observer that discards everything. Useful as a sink when only
    /// the side effects of a subscription matter.
    pub fn noop() -> Observer<T> {
        Observer::new(|_item| {}, |_err| {}, || {})
    }

    /// An observer that logs every notification at debug level, tagged
    /// with `label`.
    pub fn debug(label: &'static str) -> Observer<T>
    where
        T: std::fmt::Debug,
    {
        Observer::new(
            move |item| debug!("{}: next: {:?}", label, item),
            move |err| debug!("{}: error: {}", label, err),
            move || debug!("{}: completed", label),
        )
    }

    /// Delivers a value with the background context.
    pub fn on_next(&self, item: T) {
        self.on_next_with(&Context::background(), item);
    }

    /// Delivers a value.
    ///
    /// Ignored once the observer is terminal. A panic in the user callback
    /// is caught and routed through the error callback; if a terminal
    /// notification won the race, the panic is swallowed.
    pub fn on_next_with(&self, context: &Context, item: T) {
        if self.status.load(Ordering::Acquire) != ACTIVE {
            return;
        }
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (self.next)(context, item))) {
            let err = panic_error(payload);
            if self.transition(ERRORED) {
                self.call_error(context, err);
            }
        }
    }

    /// Delivers a failure with the background context.
    pub fn on_error(&self, err: DynError) {
        self.on_error_with(&Context::background(), err);
    }

    /// Delivers a failure. The error callback runs only if this is the
    /// first terminal notification.
    pub fn on_error_with(&self, context: &Context, err: DynError) {
        if self.transition(ERRORED) {
            self.call_error(context, err);
        }
    }

    /// Delivers completion with the background context.
    pub fn on_completed(&self) {
        self.on_completed_with(&Context::background());
    }

    /// Delivers completion. The completed callback runs only if this is
    /// the first terminal notification.
    pub fn on_completed_with(&self, context: &Context) {
        if self.transition(COMPLETED) {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (self.completed)(context))) {
                warn!(
                    "completed callback panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Whether no terminal notification has been delivered yet.
    pub fn is_active(&self) -> bool {
        self.status.load(Ordering::Acquire) == ACTIVE
    }

    /// Whether the observer terminated with a failure.
    pub fn is_errored(&self) -> bool {
        self.status.load(Ordering::Acquire) == ERRORED
    }

    /// Whether the observer terminated with completion.
    pub fn is_completed(&self) -> bool {
        self.status.load(Ordering::Acquire) == COMPLETED
    }

    /// Attempts the only legal transitions, active to errored or active to
    /// completed. Exactly one caller ever wins.
    fn transition(&self, to: u8) -> bool {
        self.status
            .compare_exchange(ACTIVE, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Runs the error callback outside any lock. A panic inside it has no
    /// further notification to become, so it is contained and logged.
    fn call_error(&self, context: &Context, err: DynError) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (self.error)(context, err))) {
            warn!(
                "error callback panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}
