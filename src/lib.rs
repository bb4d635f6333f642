// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Ripple is a push-based reactive streams library.
//!
//! An [`Observable`] represents a stream of values, much like an iterator,
//! but instead of being “pull-based” like an iterator, it is “push-based”:
//! an [`Observer`] subscribes, and the observable calls it for every value
//! produced, then once with *completed* or *error*. The result of
//! subscribing is a [`Subscription`], a handle that owns the production's
//! teardown callbacks and can cancel it.
//!
//! Observables are cold: every subscription runs an independent
//! production. The hot counterpart is the subject family
//! ([`PublishSubject`], [`BehaviorSubject`], [`ReplaySubject`],
//! [`AsyncSubject`]): a subject is an observable and an observer at once,
//! multicasting everything pushed into it to its current subscribers.
//!
//! Pipelines compose with [`Observable::pipe`], the [`pipe!`] macro, and
//! [`compose!`]. Delivery is synchronous end to end: a producer's call
//! returns only after the terminal consumer is done, which is the
//! library's backpressure. A pipeline opts into asynchrony with the
//! bounded queues of [`subscribe_on`] and [`observe_on`].
//!
//! Cancellation, deadlines, and ambient values travel through a
//! [`Context`] passed with every notification; see [`collect`] and
//! [`collect_with_context`] for draining a stream to completion.

pub mod collect;
pub mod context;
pub mod error;
pub mod generate;
pub mod observable;
pub mod observer;
pub mod subject;
pub mod subscription;
pub mod transform;

pub use collect::{collect, collect_with_context};
pub use context::{Canceller, Context};
pub use error::{DynError, Error};
pub use generate::{
    defer, empty, from_channel, from_iter, from_slice, from_vec, future, interval,
    interval_with_initial, just, never, rand_float64, rand_float64_with_rng, rand_int_n,
    rand_int_n_with_rng, range, range_with_interval, range_with_step,
    range_with_step_and_interval, repeat, repeat_with_interval, throw, timer,
};
pub use observable::{Observable, Producer};
pub use observer::{Notification, Observer};
pub use subject::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject};
pub use subscription::{Subscription, Teardown};
pub use transform::{observe_on, pipe, serialize, subscribe_on};
