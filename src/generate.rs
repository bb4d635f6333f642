// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! The canonical producer catalog.
//!
//! All producers here are cold: every subscription runs an independent
//! production. The synchronous ones ([`just`], [`from_vec`], [`range`],
//! [`repeat`], …) complete inside the subscribe call; the timed and
//! asynchronous ones ([`interval`], [`timer`], [`future`],
//! [`from_channel`], [`never`]) spawn a thread, return immediately, and
//! deliver later.
//!
//! Every producer that can suspend selects against the context's done
//! channel; on cancellation it emits an error carrying the cancellation
//! cause and stops. Synchronous producers check for cancellation between
//! emissions. No producer emits a value after it has observed
//! cancellation or teardown.

use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{after, bounded, select, tick, Receiver};
use rand::Rng;

use crate::context::Context;
use crate::error::{DynError, Error};
use crate::observable::{forwarding_observer, Observable};
use crate::observer::Observer;
use crate::subscription::Teardown;

/// An observable that completes without producing a value.
pub fn empty<T: 'static>() -> Observable<T> {
    Observable::new(|context, observer| {
        observer.on_completed_with(context);
        None
    })
}

/// An observable that fails with `err` without producing a value.
pub fn throw<T: 'static>(err: DynError) -> Observable<T> {
    Observable::new(move |context, observer| {
        observer.on_error_with(context, err.clone());
        None
    })
}

/// An observable that never produces a value and never completes on its
/// own. It parks until the context is cancelled, in which case it fails
/// with the cancellation cause, or until the subscription closes.
pub fn never<T: Send + Sync + 'static>() -> Observable<T> {
    Observable::new(|context, observer| {
        let (stop, stopped) = bounded::<()>(0);
        let done = context.done();
        let context = context.clone();
        let observer = observer.clone();
        thread::spawn(move || {
            select! {
                recv(done) -> _ => observer.on_error_with(&context, cancel_cause(&context)),
                recv(stopped) -> _ => {}
            }
        });
        Some(Box::new(move || drop(stop)))
    })
}

/// An observable that produces a single value and then completes.
pub fn just<T: Clone + Send + Sync + 'static>(value: T) -> Observable<T> {
    from_vec(vec![value])
}

/// Produces each value of the vector in order, then completes.
pub fn from_vec<T: Clone + Send + Sync + 'static>(values: Vec<T>) -> Observable<T> {
    Observable::new(move |context, observer| {
        for value in &values {
            if stop_on_cancel(context, observer) {
                return None;
            }
            observer.on_next_with(context, value.clone());
        }
        observer.on_completed_with(context);
        None
    })
}

/// Produces each value of the slice in order, then completes.
pub fn from_slice<T: Clone + Send + Sync + 'static>(values: &[T]) -> Observable<T> {
    from_vec(values.to_vec())
}

/// Produces each value of the iterator in order, then completes. The
/// iterator is drained once, up front, so every subscription sees the
/// same sequence.
pub fn from_iter<T: Clone + Send + Sync + 'static>(
    values: impl IntoIterator<Item = T>,
) -> Observable<T> {
    from_vec(values.into_iter().collect())
}

/// Produces the given values in order, then completes.
///
/// ```ignore
/// let primes = of![2, 3, 5, 7];
/// ```
#[macro_export]
macro_rules! of {
    ($($value:expr),* $(,)?) => {
        $crate::generate::from_vec(vec![$($value),*])
    };
}

/// Calls `factory` on every subscription and forwards the subscription to
/// the observable it returns. This defers the choice of observable to
/// subscription time.
pub fn defer<T: 'static>(
    factory: impl Fn() -> Observable<T> + Send + Sync + 'static,
) -> Observable<T> {
    Observable::new(move |context, observer| {
        let child = factory().subscribe_with(context, forwarding_observer(observer));
        Some(Box::new(move || child.unsubscribe()))
    })
}

/// Runs `factory` on a separate thread and produces its result: the value
/// followed by completion, or the error. Cancellation observed when the
/// factory returns wins over its result.
pub fn future<T, F>(factory: F) -> Observable<T>
where
    T: Send + Sync + 'static,
    F: Fn() -> Result<T, DynError> + Send + Sync + 'static,
{
    let factory = Arc::new(factory);
    Observable::new(move |context, observer| {
        let stopped = Arc::new(AtomicBool::new(false));
        let stop = stopped.clone();
        let factory = factory.clone();
        let context = context.clone();
        let observer = observer.clone();
        thread::spawn(move || {
            let outcome = factory();
            if stopped.load(Ordering::Acquire) {
                return;
            }
            if context.is_cancelled() {
                observer.on_error_with(&context, cancel_cause(&context));
                return;
            }
            match outcome {
                Ok(value) => {
                    observer.on_next_with(&context, value);
                    observer.on_completed_with(&context);
                }
                Err(err) => observer.on_error_with(&context, err),
            }
        });
        Some(Box::new(move || stop.store(true, Ordering::Release)))
    })
}

/// Produces the integers in `start..end`, then completes.
pub fn range(start: i64, end: i64) -> Observable<i64> {
    range_with_step(start, end, 1)
}

/// Produces `start`, `start + step`, … up to but excluding `end`, then
/// completes. A step of zero or less fails with [`Error::InvalidStep`].
pub fn range_with_step(start: i64, end: i64, step: i64) -> Observable<i64> {
    Observable::new(move |context, observer| {
        if step <= 0 {
            observer.on_error_with(context, Error::InvalidStep.shared());
            return None;
        }
        let mut current = start;
        while current < end {
            if stop_on_cancel(context, observer) {
                return None;
            }
            observer.on_next_with(context, current);
            current += step;
        }
        observer.on_completed_with(context);
        None
    })
}

/// Like [`range`], but each value is produced one period after the
/// previous one, on a separate thread.
pub fn range_with_interval(start: i64, end: i64, period: Duration) -> Observable<i64> {
    Observable::new(move |context, observer| {
        spawn_timed(context, observer, None, period, start..end)
    })
}

/// Like [`range_with_step`], but timed; see [`range_with_interval`].
pub fn range_with_step_and_interval(
    start: i64,
    end: i64,
    step: i64,
    period: Duration,
) -> Observable<i64> {
    Observable::new(move |context, observer| {
        if step <= 0 {
            observer.on_error_with(context, Error::InvalidStep.shared());
            return None;
        }
        let values = (start..end).step_by(step as usize);
        spawn_timed(context, observer, None, period, values)
    })
}

/// Produces 0, 1, 2, … every `period`, indefinitely, until the context is
/// cancelled or the subscription closes.
pub fn interval(period: Duration) -> Observable<i64> {
    Observable::new(move |context, observer| {
        spawn_timed(context, observer, None, period, 0i64..)
    })
}

/// Like [`interval`], but the first value is produced after `initial`
/// instead of after `period`. An `initial` of zero produces 0
/// synchronously, before the ticker starts.
pub fn interval_with_initial(initial: Duration, period: Duration) -> Observable<i64> {
    Observable::new(move |context, observer| {
        if initial.is_zero() {
            if stop_on_cancel(context, observer) {
                return None;
            }
            observer.on_next_with(context, 0);
            spawn_timed(context, observer, None, period, 1i64..)
        } else {
            spawn_timed(context, observer, Some(initial), period, 0i64..)
        }
    })
}

/// Produces a single `0` after `delay`, then completes.
pub fn timer(delay: Duration) -> Observable<i64> {
    Observable::new(move |context, observer| {
        spawn_timed(context, observer, Some(delay), delay, iter::once(0i64))
    })
}

/// Forwards every value received on the channel; completes when the
/// channel closes. Consumption happens on a separate thread, so multiple
/// subscriptions to the same channel divide its values between them.
pub fn from_channel<T: Send + Sync + 'static>(source: Receiver<T>) -> Observable<T> {
    Observable::new(move |context, observer| {
        let (stop, stopped) = bounded::<()>(0);
        let done = context.done();
        let source = source.clone();
        let context = context.clone();
        let observer = observer.clone();
        thread::spawn(move || loop {
            select! {
                recv(done) -> _ => {
                    observer.on_error_with(&context, cancel_cause(&context));
                    return;
                }
                recv(stopped) -> _ => return,
                recv(source) -> message => match message {
                    Ok(value) => observer.on_next_with(&context, value),
                    Err(_) => {
                        observer.on_completed_with(&context);
                        return;
                    }
                },
            }
        });
        Some(Box::new(move || drop(stop)))
    })
}

/// Produces `value` `count` times, then completes. A count of zero is
/// [`empty`]; a negative count fails with [`Error::InvalidCount`].
pub fn repeat<T: Clone + Send + Sync + 'static>(value: T, count: i64) -> Observable<T> {
    Observable::new(move |context, observer| {
        if count < 0 {
            observer.on_error_with(context, Error::InvalidCount.shared());
            return None;
        }
        for _ in 0..count {
            if stop_on_cancel(context, observer) {
                return None;
            }
            observer.on_next_with(context, value.clone());
        }
        observer.on_completed_with(context);
        None
    })
}

/// Like [`repeat`], but each value is produced one period after the
/// previous one, on a separate thread.
pub fn repeat_with_interval<T: Clone + Send + Sync + 'static>(
    value: T,
    count: i64,
    period: Duration,
) -> Observable<T> {
    Observable::new(move |context, observer| {
        if count < 0 {
            observer.on_error_with(context, Error::InvalidCount.shared());
            return None;
        }
        if count == 0 {
            observer.on_completed_with(context);
            return None;
        }
        let values = iter::repeat(value.clone()).take(count as usize);
        spawn_timed(context, observer, None, period, values)
    })
}

/// Produces `count` integers drawn uniformly from `0..bound`, then
/// completes. Each subscription draws its own sequence.
pub fn rand_int_n(bound: i64, count: i64) -> Observable<i64> {
    rand_int_n_with_rng(rand::thread_rng, bound, count)
}

/// Like [`rand_int_n`], with an injectable generator for deterministic
/// sequences; `rng` is called once per subscription.
pub fn rand_int_n_with_rng<R, F>(rng: F, bound: i64, count: i64) -> Observable<i64>
where
    R: Rng,
    F: Fn() -> R + Send + Sync + 'static,
{
    Observable::new(move |context, observer| {
        if count < 0 || bound <= 0 {
            observer.on_error_with(context, Error::InvalidCount.shared());
            return None;
        }
        let mut rng = rng();
        for _ in 0..count {
            if stop_on_cancel(context, observer) {
                return None;
            }
            observer.on_next_with(context, rng.gen_range(0..bound));
        }
        observer.on_completed_with(context);
        None
    })
}

/// Produces `count` floats drawn uniformly from `[0, 1)`, then completes.
pub fn rand_float64(count: i64) -> Observable<f64> {
    rand_float64_with_rng(rand::thread_rng, count)
}

/// Like [`rand_float64`], with an injectable generator; `rng` is called
/// once per subscription.
pub fn rand_float64_with_rng<R, F>(rng: F, count: i64) -> Observable<f64>
where
    R: Rng,
    F: Fn() -> R + Send + Sync + 'static,
{
    Observable::new(move |context, observer| {
        if count < 0 {
            observer.on_error_with(context, Error::InvalidCount.shared());
            return None;
        }
        let mut rng = rng();
        for _ in 0..count {
            if stop_on_cancel(context, observer) {
                return None;
            }
            observer.on_next_with(context, rng.gen::<f64>());
        }
        observer.on_completed_with(context);
        None
    })
}

/// The error a cancelled context turns into.
fn cancel_cause(context: &Context) -> DynError {
    context
        .cause()
        .unwrap_or_else(|| Error::Cancelled.shared())
}

/// Checks for cancellation between synchronous emissions. When the
/// context is cancelled this fails the observer with the cause and
/// reports that the production must stop.
fn stop_on_cancel<T: 'static>(context: &Context, observer: &Arc<Observer<T>>) -> bool {
    if context.is_cancelled() {
        observer.on_error_with(context, cancel_cause(context));
        true
    } else {
        false
    }
}

/// The timed emission loop shared by the interval producers. Emits the
/// first value after `initial` if given, then one value per `period`
/// tick, completing when the values run out. Stops on context
/// cancellation (failing with the cause) and on teardown (silently).
fn spawn_timed<T, I>(
    context: &Context,
    observer: &Arc<Observer<T>>,
    initial: Option<Duration>,
    period: Duration,
    mut values: I,
) -> Option<Teardown>
where
    T: Send + Sync + 'static,
    I: Iterator<Item = T> + Send + 'static,
{
    let (stop, stopped) = bounded::<()>(0);
    let done = context.done();
    let context = context.clone();
    let observer = observer.clone();
    thread::spawn(move || {
        if let Some(delay) = initial {
            let first = after(delay);
            select! {
                recv(done) -> _ => {
                    observer.on_error_with(&context, cancel_cause(&context));
                    return;
                }
                recv(stopped) -> _ => return,
                recv(first) -> _ => match values.next() {
                    Some(value) => observer.on_next_with(&context, value),
                    None => {
                        observer.on_completed_with(&context);
                        return;
                    }
                },
            }
        }
        let ticks = tick(period);
        for value in values {
            select! {
                recv(done) -> _ => {
                    observer.on_error_with(&context, cancel_cause(&context));
                    return;
                }
                recv(stopped) -> _ => return,
                recv(ticks) -> _ => observer.on_next_with(&context, value),
            }
        }
        observer.on_completed_with(&context);
    });
    Some(Box::new(move || drop(stop)))
}
