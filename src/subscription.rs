// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! A module for dealing with decoupled lifetime and ownership.
//!
//! A subscription represents one in-flight production. It owns the
//! teardown callbacks that release whatever resources the production
//! holds: closing the subscription runs them exactly once, in reverse
//! registration order, like scoped resource release. Handles are cheap to
//! clone; all clones refer to the same registry, so any of them can close
//! the production and any of them can block on [`Subscription::wait`]
//! until it ends.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::error::panic_message;

/// A callback run when a subscription closes, releasing a resource.
pub type Teardown = Box<dyn FnOnce() + Send>;

struct State {
    closed: bool,
    teardowns: Vec<Teardown>,
}

struct Inner {
    /// Mirror of `State::closed` for lock-free snapshots.
    closed: AtomicBool,
    state: Mutex<State>,
    on_closed: Condvar,
}

/// A handle to an in-flight production.
///
/// The handle owns a registry of teardown callbacks and a closed flag.
/// Closing is idempotent, safe under concurrent attempts, and runs every
/// teardown exactly once, last registered first. A teardown registered
/// after the subscription closed runs immediately: the registry never
/// silently drops one.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

impl Subscription {
    /// Creates an open subscription with an empty teardown registry.
    pub fn new() -> Subscription {
        Subscription {
            inner: Arc::new(Inner {
                closed: AtomicBool::new(false),
                state: Mutex::new(State {
                    closed: false,
                    teardowns: Vec::new(),
                }),
                on_closed: Condvar::new(),
            }),
        }
    }

    /// Registers a teardown. If the subscription is already closed, the
    /// teardown runs immediately on the calling thread.
    pub fn add(&self, teardown: impl FnOnce() + Send + 'static) {
        let teardown: Teardown = Box::new(teardown);
        let mut state = self.inner.state.lock();
        if state.closed {
            // Close-versus-add is decided under the lock, so the teardown
            // cannot end up both unregistered and unrun.
            drop(state);
            run_teardown(teardown);
        } else {
            state.teardowns.push(teardown);
        }
    }

    /// Ties `child` to this subscription: closing this subscription closes
    /// the child. A failing child does not affect this subscription.
    pub fn add_child(&self, child: &Subscription) {
        let child = child.clone();
        self.add(move || child.unsubscribe());
    }

    /// Closes the subscription and runs all teardowns, last registered
    /// first, outside the registry lock. Calls past the first are no-ops.
    /// A panicking teardown is contained and does not prevent the rest
    /// from running.
    pub fn unsubscribe(&self) {
        let teardowns = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            self.inner.closed.store(true, Ordering::Release);
            self.inner.on_closed.notify_all();
            std::mem::take(&mut state.teardowns)
        };
        for teardown in teardowns.into_iter().rev() {
            run_teardown(teardown);
        }
    }

    /// Blocks until the subscription closes, either because the producer
    /// reached a terminal notification or because it was unsubscribed.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while !state.closed {
            self.inner.on_closed.wait(&mut state);
        }
    }

    /// Whether the subscription has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl Default for Subscription {
    fn default() -> Subscription {
        Subscription::new()
    }
}

fn run_teardown(teardown: Teardown) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(teardown)) {
        warn!("teardown panicked: {}", panic_message(payload.as_ref()));
    }
}
