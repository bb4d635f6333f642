// Ripple -- Reactive streams for Rust
// Copyright 2026 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! The error taxonomy of the kernel.
//!
//! Errors that travel through a stream are dynamically typed: an observable
//! can fail with any error the producer chooses, and a subject multicasts
//! one failure to many observers. [`DynError`] is therefore a shared trait
//! object, cheap to clone per observer. The kernel itself produces only the
//! few sentinel kinds in [`Error`].

use std::any::Any;
use std::sync::Arc;

/// A shared, dynamically typed error.
///
/// This is the error type that flows through streams. It is reference
/// counted so that multicasting a failure to every subscriber of a subject
/// does not require the error to be `Clone` itself.
pub type DynError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The sentinel error kinds produced by the kernel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The subscription context was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The subscription context reached its deadline.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A repetition or sample count was out of range.
    #[error("count must not be negative")]
    InvalidCount,

    /// A range step was zero or negative.
    #[error("range step must be positive")]
    InvalidStep,

    /// A user callback panicked; the message is the panic payload.
    #[error("observer callback panicked: {0}")]
    CallbackPanic(String),
}

impl Error {
    /// Wraps the sentinel in the shared error representation.
    pub fn shared(self) -> DynError {
        Arc::new(self)
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Converts a caught panic payload into the shared error representation.
pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> DynError {
    Error::CallbackPanic(panic_message(payload.as_ref())).shared()
}
