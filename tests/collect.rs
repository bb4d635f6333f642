// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

use std::time::Duration;

use pretty_assertions::assert_eq;

use ripple::{collect, collect_with_context, Context, Error, Observable};

#[test]
fn collect_returns_the_full_sequence_on_completion() {
    let (values, error) = collect(&ripple::range(0, 5));
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    assert!(error.is_none());
}

#[test]
fn collect_returns_partial_values_with_the_error() {
    let observable = Observable::new(move |context, observer| {
        observer.on_next_with(context, 1);
        observer.on_next_with(context, 2);
        observer.on_error_with(context, Error::InvalidStep.shared());
        None
    });

    let (values, error) = collect(&observable);
    assert_eq!(values, vec![1, 2]);
    assert_eq!(
        error.unwrap().downcast_ref::<Error>(),
        Some(&Error::InvalidStep)
    );
}

#[test]
fn collect_with_context_returns_the_terminal_context() {
    let context = Context::background().with_value("job", 17u32);
    let (values, error, terminal) = collect_with_context(&context, &ripple::just(1));

    assert_eq!(values, vec![1]);
    assert!(error.is_none());
    // The context flowed through the producer to the terminal
    // notification unchanged.
    let job = terminal.value("job").unwrap();
    assert_eq!(job.downcast_ref::<u32>(), Some(&17));
}

#[test]
fn collect_with_context_surfaces_the_deadline_cause() {
    let (context, _canceller) = Context::background().with_timeout(Duration::from_millis(20));
    let (values, error, terminal) =
        collect_with_context(&context, &ripple::never::<u8>());

    assert_eq!(values, Vec::<u8>::new());
    assert_eq!(
        error.unwrap().downcast_ref::<Error>(),
        Some(&Error::DeadlineExceeded)
    );
    assert!(terminal.is_cancelled());
}

#[test]
fn collect_blocks_until_an_asynchronous_stream_ends() {
    let observable = ripple::range_with_interval(0, 4, Duration::from_millis(5));
    let (values, error) = collect(&observable);
    assert_eq!(values, vec![0, 1, 2, 3]);
    assert!(error.is_none());
}
