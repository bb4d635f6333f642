// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Terminal collectors: blocking drains of a stream.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::Context;
use crate::error::DynError;
use crate::observable::Observable;
use crate::observer::Observer;

/// Subscribes to `source`, accumulates every value, and blocks until the
/// stream ends. On completion the full sequence is returned with no
/// error; on failure, whatever was collected so far plus the error.
pub fn collect<T: Clone + Send + Sync + 'static>(
    source: &Observable<T>,
) -> (Vec<T>, Option<DynError>) {
    let (values, error, _context) = collect_with_context(&Context::background(), source);
    (values, error)
}

/// Like [`collect`], subscribing under the given context, and additionally
/// returning the context observed on the terminal notification. If the
/// subscription was closed without a terminal notification, the subscribe
/// context is returned.
pub fn collect_with_context<T: Clone + Send + Sync + 'static>(
    context: &Context,
    source: &Observable<T>,
) -> (Vec<T>, Option<DynError>, Context) {
    let values = Arc::new(Mutex::new(Vec::new()));
    let outcome = Arc::new(Mutex::new((None::<DynError>, None::<Context>)));

    let observer = {
        let values = values.clone();
        let failed = outcome.clone();
        let ended = outcome.clone();
        Observer::with_context(
            move |_context: &Context, item: T| values.lock().push(item),
            move |context: &Context, err: DynError| {
                let mut outcome = failed.lock();
                outcome.0 = Some(err);
                outcome.1 = Some(context.clone());
            },
            move |context: &Context| ended.lock().1 = Some(context.clone()),
        )
    };

    let subscription = source.subscribe_with(context, observer);
    subscription.wait();

    let collected = std::mem::take(&mut *values.lock());
    let (error, terminal_context) = {
        let mut outcome = outcome.lock();
        (outcome.0.take(), outcome.1.take())
    };
    (
        collected,
        error,
        terminal_context.unwrap_or_else(|| context.clone()),
    )
}
