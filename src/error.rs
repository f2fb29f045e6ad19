//! Error types and the [`Error`] trait.
//!
//! Every error in this library implements the [`Error`] trait, which extends
//! [`std::error::Error`] with retry semantics. Interceptors use
//! [`Error::is_retryable`] to decide whether a failed request is worth
//! rescuing. [`BoxedError`] erases the concrete type while keeping both the
//! retry hint and the ability to downcast.

use std::convert::Infallible;

use snafu::{AsErrorSource, Snafu};

use crate::platform::MaybeSendSync;

/// Errors that may occur in the library.
pub trait Error: std::error::Error + AsErrorSource + MaybeSendSync + 'static {
    /// If true, this indicates that a failed request may succeed if retried.
    fn is_retryable(&self) -> bool;
}

impl Error for Infallible {
    fn is_retryable(&self) -> bool {
        false
    }
}

impl Error for serde_json::Error {
    fn is_retryable(&self) -> bool {
        false
    }
}

impl Error for serde_html_form::ser::Error {
    fn is_retryable(&self) -> bool {
        false
    }
}

impl Error for std::io::Error {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
        )
    }
}

/// A boxed error that can be used without type parameters.
#[derive(Debug, Snafu)]
#[snafu(transparent)]
pub struct BoxedError {
    source: Box<dyn Error>,
}

impl BoxedError {
    /// Create a new boxed error from a generic `Error`.
    pub fn from_err<E: Error + 'static>(err: E) -> Self {
        Self {
            source: Box::new(err),
        }
    }

    /// Returns the inner error as `E` if that is its concrete type.
    #[must_use]
    pub fn downcast_ref<E: Error>(&self) -> Option<&E> {
        let source: &(dyn std::error::Error + 'static) = &*self.source;
        source.downcast_ref::<E>()
    }

    /// Returns true if the inner error is of type `E`.
    #[must_use]
    pub fn is<E: Error>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }
}

impl Error for BoxedError {
    fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}
