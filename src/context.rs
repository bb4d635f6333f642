// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! An ambient carrier for cancellation, deadlines, and keyed values.
//!
//! A [`Context`] travels with every subscription and every notification.
//! Producers that can suspend select against its done channel and stop
//! with the cancellation cause when it becomes ready; operators pass the
//! context through unmodified unless they explicitly substitute it.
//!
//! Contexts form a derivation chain: cancelling a context cancels every
//! context derived from it, and a derived deadline can only tighten the
//! parent's. The background context is never cancelled and allocates
//! nothing.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{after, bounded, never, select, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{DynError, Error};

/// The cancellable part of a context, shared by every derived context up
/// to the nearest cancellation point.
struct CancelNode {
    /// Becomes ready (disconnected) once the node is cancelled.
    done: Receiver<()>,

    /// Dropping this sender disconnects `done`.
    trigger: Mutex<Option<Sender<()>>>,

    cancelled: AtomicBool,
    cause: Mutex<Option<DynError>>,
}

impl CancelNode {
    fn new() -> Arc<CancelNode> {
        let (trigger, done) = bounded::<()>(0);
        Arc::new(CancelNode {
            done,
            trigger: Mutex::new(Some(trigger)),
            cancelled: AtomicBool::new(false),
            cause: Mutex::new(None),
        })
    }

    /// Records the cause and disconnects the done channel. First caller
    /// wins; later causes are discarded.
    fn cancel(&self, cause: DynError) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.cause.lock() = Some(cause);
        // Dropping the sender is what wakes up the done channel.
        self.trigger.lock().take();
    }

    fn cause(&self) -> Option<DynError> {
        self.cause.lock().clone()
    }
}

struct Inner {
    /// The nearest cancellation point on the derivation chain, if any.
    cancel: Option<Arc<CancelNode>>,
    deadline: Option<Instant>,
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

/// An ambient carrier for cancellation signals, deadlines, and keyed
/// values, passed through every subscription and notification.
#[derive(Clone)]
pub struct Context {
    inner: Option<Arc<Inner>>,
}

/// The handle that cancels a context created with [`Context::with_cancel`],
/// [`Context::with_deadline`], or [`Context::with_timeout`].
pub struct Canceller {
    node: Arc<CancelNode>,
}

impl Canceller {
    /// Cancels the context. Every context derived from it observes the
    /// cancellation; the cause is [`Error::Cancelled`]. Idempotent.
    pub fn cancel(&self) {
        self.node.cancel(Error::Cancelled.shared());
    }
}

impl Context {
    /// The root context: never cancelled, no deadline, no values.
    pub fn background() -> Context {
        Context { inner: None }
    }

    /// Derives a context that is cancelled by the returned [`Canceller`],
    /// or when this context is cancelled, whichever happens first.
    pub fn with_cancel(&self) -> (Context, Canceller) {
        let node = CancelNode::new();
        self.link_parent(&node, None);
        let context = self.derive(Some(node.clone()), self.deadline());
        (context, Canceller { node })
    }

    /// Derives a context that is cancelled with [`Error::DeadlineExceeded`]
    /// once `deadline` passes. The effective deadline never exceeds the
    /// parent's.
    pub fn with_deadline(&self, deadline: Instant) -> (Context, Canceller) {
        let deadline = match self.deadline() {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        let node = CancelNode::new();
        let timer = after(deadline.saturating_duration_since(Instant::now()));
        self.link_parent(&node, Some(timer));
        let context = self.derive(Some(node.clone()), Some(deadline));
        (context, Canceller { node })
    }

    /// Derives a context cancelled `timeout` from now; see
    /// [`Context::with_deadline`].
    pub fn with_timeout(&self, timeout: Duration) -> (Context, Canceller) {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a context that carries `value` under `key`. Lookup falls
    /// back to the values inherited from the parent.
    pub fn with_value(
        &self,
        key: impl Into<String>,
        value: impl Any + Send + Sync,
    ) -> Context {
        let mut context = self.derive(self.cancel_node(), self.deadline());
        // `derive` just built a fresh inner, it is not shared yet.
        let inner = context.inner.as_mut().and_then(Arc::get_mut);
        if let Some(inner) = inner {
            inner.values.insert(key.into(), Arc::new(value));
        }
        context
    }

    /// Looks up a value on the derivation chain.
    pub fn value(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.inner
            .as_ref()
            .and_then(|inner| inner.values.get(key).cloned())
    }

    /// The effective deadline, if any context on the chain set one.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.as_ref().and_then(|inner| inner.deadline)
    }

    /// A channel that becomes ready when the context is cancelled,
    /// suitable for `select!`. The background context's channel is never
    /// ready.
    pub fn done(&self) -> Receiver<()> {
        match self.cancel_node() {
            Some(node) => node.done.clone(),
            None => never(),
        }
    }

    /// Whether the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        match self.cancel_node() {
            Some(node) => node.cancelled.load(Ordering::Acquire),
            None => false,
        }
    }

    /// The cancellation cause: [`Error::Cancelled`],
    /// [`Error::DeadlineExceeded`], or `None` while the context is live.
    pub fn cause(&self) -> Option<DynError> {
        self.cancel_node().and_then(|node| node.cause())
    }

    fn cancel_node(&self) -> Option<Arc<CancelNode>> {
        self.inner.as_ref().and_then(|inner| inner.cancel.clone())
    }

    fn derive(&self, cancel: Option<Arc<CancelNode>>, deadline: Option<Instant>) -> Context {
        let values = match &self.inner {
            Some(inner) => inner.values.clone(),
            None => HashMap::new(),
        };
        Context {
            inner: Some(Arc::new(Inner {
                cancel,
                deadline,
                values,
            })),
        }
    }

    /// Wires `node` to this context's cancellation and an optional timer.
    /// The watcher thread exits as soon as any of the three fires.
    fn link_parent(&self, node: &Arc<CancelNode>, timer: Option<Receiver<Instant>>) {
        let parent = self.cancel_node();
        if let Some(parent) = &parent {
            if parent.cancelled.load(Ordering::Acquire) {
                node.cancel(parent.cause().unwrap_or_else(|| Error::Cancelled.shared()));
                return;
            }
        }
        if parent.is_none() && timer.is_none() {
            // Nothing to watch; only the canceller can fire this node.
            return;
        }
        let child = node.clone();
        thread::spawn(move || {
            let child_done = child.done.clone();
            let parent_done = match &parent {
                Some(parent) => parent.done.clone(),
                None => never(),
            };
            let timer = timer.unwrap_or_else(never);
            select! {
                recv(timer) -> _ => child.cancel(Error::DeadlineExceeded.shared()),
                recv(parent_done) -> _ => {
                    let cause = parent
                        .as_ref()
                        .and_then(|parent| parent.cause())
                        .unwrap_or_else(|| Error::Cancelled.shared());
                    child.cancel(cause);
                }
                recv(child_done) -> _ => {}
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_never_cancelled() {
        let context = Context::background();
        assert!(!context.is_cancelled());
        assert!(context.cause().is_none());
        assert!(context.deadline().is_none());
    }

    #[test]
    fn cancel_closes_done_and_records_cause() {
        let (context, canceller) = Context::background().with_cancel();
        assert!(!context.is_cancelled());
        canceller.cancel();
        assert!(context.is_cancelled());
        // The done channel is disconnected now, so recv fails immediately.
        assert!(context.done().recv().is_err());
        let cause = context.cause().unwrap();
        assert_eq!(cause.downcast_ref::<Error>(), Some(&Error::Cancelled));
    }

    #[test]
    fn cancel_is_idempotent() {
        let (context, canceller) = Context::background().with_cancel();
        canceller.cancel();
        canceller.cancel();
        assert!(context.is_cancelled());
    }

    #[test]
    fn timeout_cancels_with_deadline_exceeded() {
        let (context, _canceller) =
            Context::background().with_timeout(Duration::from_millis(20));
        // Block until the deadline watcher fires.
        assert!(context.done().recv().is_err());
        let cause = context.cause().unwrap();
        assert_eq!(cause.downcast_ref::<Error>(), Some(&Error::DeadlineExceeded));
    }

    #[test]
    fn parent_cancellation_reaches_children() {
        let (parent, canceller) = Context::background().with_cancel();
        let (child, _child_canceller) = parent.with_cancel();
        canceller.cancel();
        assert!(child.done().recv().is_err());
        assert!(child.is_cancelled());
        let cause = child.cause().unwrap();
        assert_eq!(cause.downcast_ref::<Error>(), Some(&Error::Cancelled));
    }

    #[test]
    fn values_are_inherited() {
        let context = Context::background().with_value("user", "ruud".to_string());
        let (derived, _canceller) = context.with_cancel();
        let value = derived.value("user").unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "ruud");
        assert!(derived.value("missing").is_none());
    }

    #[test]
    fn child_deadline_never_exceeds_parent() {
        let far = Instant::now() + Duration::from_secs(60);
        let near = Instant::now() + Duration::from_millis(10);
        let (parent, _c1) = Context::background().with_deadline(near);
        let (child, _c2) = parent.with_deadline(far);
        assert!(child.deadline().unwrap() <= near);
    }
}
