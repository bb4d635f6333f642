// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Both an observer and observable.
//!
//! A subject is a hot multicast hub: values pushed into its observer half
//! are delivered to every currently subscribed observer, and new
//! subscribers first receive whatever the subject's retention policy has
//! kept. Four policies exist:
//!
//!  * [`PublishSubject`]: retains nothing; subscribers see only future
//!    values.
//!  * [`BehaviorSubject`]: retains the single most recent value,
//!    initialized at construction; every new subscriber immediately
//!    receives it.
//!  * [`ReplaySubject`]: retains the last N values and replays them in
//!    emission order.
//!  * [`AsyncSubject`]: retains the last value but delivers nothing
//!    until completion; then every subscriber, present and future,
//!    receives that value followed by completion.
//!
//! Subjects are terminal: after an error or completion, later values are
//! discarded and later subscribers immediately receive the retained
//! values (per policy) and the terminal notification.
//!
//! Emission snapshots the subscriber set and delivers outside the
//! subject's lock, so a subscriber may re-enter the subject (emit,
//! subscribe, unsubscribe) from within its callback without deadlocking.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::Context;
use crate::error::DynError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::{Subscription, Teardown};

/// What a subject keeps for new subscribers.
enum Retention<T> {
    /// Nothing; only live values are seen.
    Publish,
    /// The single most recent value.
    Latest(T),
    /// The last `capacity` values, oldest first.
    Window { capacity: usize, buffer: VecDeque<T> },
    /// The most recent value, held back until completion.
    Last(Option<T>),
}

impl<T: Clone> Retention<T> {
    /// Records a value; returns whether the value is also delivered live.
    fn record(&mut self, item: T) -> bool {
        match self {
            Retention::Publish => true,
            Retention::Latest(latest) => {
                *latest = item;
                true
            }
            Retention::Window { capacity, buffer } => {
                if *capacity == 0 {
                    return true;
                }
                if buffer.len() == *capacity {
                    buffer.pop_front();
                }
                buffer.push_back(item);
                true
            }
            Retention::Last(slot) => {
                *slot = Some(item);
                false
            }
        }
    }

    /// The values replayed to a subscriber that arrives before
    /// terminality.
    fn replay_live(&self) -> Vec<T> {
        match self {
            Retention::Publish | Retention::Last(_) => Vec::new(),
            Retention::Latest(latest) => vec![latest.clone()],
            Retention::Window { buffer, .. } => buffer.iter().cloned().collect(),
        }
    }

    /// The values replayed to a subscriber that arrives after
    /// terminality.
    fn replay_terminal(&self, terminal: &Terminal) -> Vec<T> {
        match self {
            Retention::Publish => Vec::new(),
            Retention::Latest(latest) => vec![latest.clone()],
            Retention::Window { buffer, .. } => buffer.iter().cloned().collect(),
            // An async subject releases its value only on completion.
            Retention::Last(slot) => match terminal {
                Terminal::Completed => slot.iter().cloned().collect(),
                Terminal::Errored(_) => Vec::new(),
            },
        }
    }
}

#[derive(Clone)]
enum Terminal {
    Errored(DynError),
    Completed,
}

struct Registered<T> {
    id: u64,
    observer: Arc<Observer<T>>,
}

struct State<T> {
    observers: Vec<Registered<T>>,
    next_id: u64,
    terminal: Option<Terminal>,
    retention: Retention<T>,
}

/// The shared core of every subject variant: a subscriber registry, a
/// retention buffer, and the terminal state, all under one lock.
struct Multicast<T> {
    state: RwLock<State<T>>,
}

impl<T: Clone + Send + Sync + 'static> Multicast<T> {
    fn new(retention: Retention<T>) -> Arc<Multicast<T>> {
        Arc::new(Multicast {
            state: RwLock::new(State {
                observers: Vec::new(),
                next_id: 0,
                terminal: None,
                retention,
            }),
        })
    }

    /// Multicasts a value: record it in the retention buffer, snapshot the
    /// subscriber set, then deliver outside the lock. Discarded once
    /// terminal.
    fn next(&self, context: &Context, item: T) {
        let recipients = {
            let mut state = self.state.write();
            if state.terminal.is_some() {
                return;
            }
            let live = state.retention.record(item.clone());
            if !live {
                return;
            }
            snapshot(&state.observers)
        };
        for observer in recipients {
            observer.on_next_with(context, item.clone());
        }
    }

    /// Multicasts a failure and enters the errored terminal state. The
    /// subscriber set is drained: the subject no longer owns its
    /// observers once they are terminal.
    fn error(&self, context: &Context, err: DynError) {
        let recipients = {
            let mut state = self.state.write();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(Terminal::Errored(err.clone()));
            std::mem::take(&mut state.observers)
        };
        for registered in recipients {
            registered.observer.on_error_with(context, err.clone());
        }
    }

    /// Multicasts completion and enters the completed terminal state. For
    /// an async subject this is the moment the retained value is released,
    /// ahead of the completion itself.
    fn completed(&self, context: &Context) {
        let (recipients, last) = {
            let mut state = self.state.write();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(Terminal::Completed);
            let last = match &state.retention {
                Retention::Last(slot) => slot.clone(),
                _ => None,
            };
            (std::mem::take(&mut state.observers), last)
        };
        for registered in recipients {
            if let Some(value) = &last {
                registered.observer.on_next_with(context, value.clone());
            }
            registered.observer.on_completed_with(context);
        }
    }

    /// The producer behind every subject's observable half. Registration
    /// and the retained snapshot happen under one lock acquisition; the
    /// retained values are delivered after the lock is released.
    fn attach(
        hub: &Arc<Multicast<T>>,
        context: &Context,
        observer: &Arc<Observer<T>>,
    ) -> Option<Teardown> {
        let mut state = hub.state.write();
        match state.terminal.clone() {
            Some(terminal) => {
                let replay = state.retention.replay_terminal(&terminal);
                drop(state);
                for value in replay {
                    observer.on_next_with(context, value);
                }
                match terminal {
                    Terminal::Errored(err) => observer.on_error_with(context, err),
                    Terminal::Completed => observer.on_completed_with(context),
                }
                None
            }
            None => {
                let replay = state.retention.replay_live();
                let id = state.next_id;
                state.next_id += 1;
                state.observers.push(Registered {
                    id,
                    observer: observer.clone(),
                });
                drop(state);
                for value in replay {
                    observer.on_next_with(context, value);
                }
                let hub = Arc::downgrade(hub);
                Some(Box::new(move || {
                    if let Some(hub) = hub.upgrade() {
                        hub.remove(id);
                    }
                }))
            }
        }
    }

    fn remove(&self, id: u64) {
        let mut state = self.state.write();
        state.observers.retain(|registered| registered.id != id);
    }

    fn count(&self) -> usize {
        self.state.read().observers.len()
    }
}

fn snapshot<T>(observers: &[Registered<T>]) -> Vec<Arc<Observer<T>>> {
    observers
        .iter()
        .map(|registered| registered.observer.clone())
        .collect()
}

macro_rules! subject_surface {
    ($name:ident) => {
        impl<T: Clone + Send + Sync + 'static> $name<T> {
            /// The observable half of the subject.
            ///
            /// When a subject is used internally as the source of an
            /// observable, a getter can expose the `observable()` of the
            /// subject without exposing the observer methods.
            pub fn observable(&self) -> Observable<T> {
                let hub = self.hub.clone();
                Observable::new(move |context, observer| {
                    Multicast::attach(&hub, context, observer)
                })
            }

            /// Subscribes an observer with the background context.
            pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
                self.observable().subscribe(observer)
            }

            /// Subscribes an observer under the given context.
            pub fn subscribe_with(&self, context: &Context, observer: Observer<T>) -> Subscription {
                self.observable().subscribe_with(context, observer)
            }

            /// The observer half of the subject, for handing the subject
            /// to a producer as its consumer.
            pub fn observer(&self) -> Observer<T> {
                let on_next = {
                    let hub = self.hub.clone();
                    move |context: &Context, item: T| hub.next(context, item)
                };
                let on_error = {
                    let hub = self.hub.clone();
                    move |context: &Context, err: DynError| hub.error(context, err)
                };
                let on_completed = {
                    let hub = self.hub.clone();
                    move |context: &Context| hub.completed(context)
                };
                Observer::with_context(on_next, on_error, on_completed)
            }

            /// Multicasts a value with the background context.
            pub fn on_next(&self, item: T) {
                self.on_next_with(&Context::background(), item);
            }

            /// Multicasts a value to the current subscribers.
            pub fn on_next_with(&self, context: &Context, item: T) {
                self.hub.next(context, item);
            }

            /// Multicasts a failure with the background context.
            pub fn on_error(&self, err: DynError) {
                self.on_error_with(&Context::background(), err);
            }

            /// Multicasts a failure; the subject becomes terminal.
            pub fn on_error_with(&self, context: &Context, err: DynError) {
                self.hub.error(context, err);
            }

            /// Multicasts completion with the background context.
            pub fn on_completed(&self) {
                self.on_completed_with(&Context::background());
            }

            /// Multicasts completion; the subject becomes terminal.
            pub fn on_completed_with(&self, context: &Context) {
                self.hub.completed(context);
            }

            /// Whether any observer is currently subscribed.
            pub fn has_observers(&self) -> bool {
                self.count_observers() > 0
            }

            /// The number of currently subscribed observers.
            pub fn count_observers(&self) -> usize {
                self.hub.count()
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> $name<T> {
                $name {
                    hub: self.hub.clone(),
                }
            }
        }
    };
}

/// A subject that retains nothing: subscribers see only values emitted
/// after they subscribed.
pub struct PublishSubject<T> {
    hub: Arc<Multicast<T>>,
}

impl<T: Clone + Send + Sync + 'static> PublishSubject<T> {
    /// Creates a new publish subject.
    pub fn new() -> PublishSubject<T> {
        PublishSubject {
            hub: Multicast::new(Retention::Publish),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for PublishSubject<T> {
    fn default() -> PublishSubject<T> {
        PublishSubject::new()
    }
}

subject_surface!(PublishSubject);

/// A subject that always has a current value: new subscribers immediately
/// receive the most recent one.
pub struct BehaviorSubject<T> {
    hub: Arc<Multicast<T>>,
}

impl<T: Clone + Send + Sync + 'static> BehaviorSubject<T> {
    /// Creates a behavior subject holding `initial` as its current value.
    pub fn new(initial: T) -> BehaviorSubject<T> {
        BehaviorSubject {
            hub: Multicast::new(Retention::Latest(initial)),
        }
    }

    /// The current value.
    pub fn value(&self) -> T {
        match &self.hub.state.read().retention {
            Retention::Latest(latest) => latest.clone(),
            // A behavior subject is constructed with Latest retention and
            // never changes policy.
            _ => unreachable!("behavior subject retains the latest value"),
        }
    }
}

subject_surface!(BehaviorSubject);

/// A subject that replays the last `capacity` values to new subscribers,
/// in emission order, before the live stream.
pub struct ReplaySubject<T> {
    hub: Arc<Multicast<T>>,
}

impl<T: Clone + Send + Sync + 'static> ReplaySubject<T> {
    /// Creates a replay subject with a retention window of `capacity`
    /// values.
    pub fn new(capacity: usize) -> ReplaySubject<T> {
        ReplaySubject {
            hub: Multicast::new(Retention::Window {
                capacity,
                buffer: VecDeque::with_capacity(capacity),
            }),
        }
    }
}

subject_surface!(ReplaySubject);

/// A subject that delivers nothing until completion; then every
/// subscriber, present and future, receives the last value (if any)
/// followed by completion. On error, subscribers receive only the error.
pub struct AsyncSubject<T> {
    hub: Arc<Multicast<T>>,
}

impl<T: Clone + Send + Sync + 'static> AsyncSubject<T> {
    /// Creates a new async subject.
    pub fn new() -> AsyncSubject<T> {
        AsyncSubject {
            hub: Multicast::new(Retention::Last(None)),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for AsyncSubject<T> {
    fn default() -> AsyncSubject<T> {
        AsyncSubject::new()
    }
}

subject_surface!(AsyncSubject);
