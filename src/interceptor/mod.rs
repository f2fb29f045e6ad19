//! Interceptors: hooks around every request a session sends.
//!
//! An [`Interceptor`] can rewrite requests before they are translated, decide
//! whether a failed attempt is retried, post-process decoded outputs, and
//! observe final results. Several interceptors compose into an
//! [`Interceptors`] chain, which is itself an interceptor.
//!
//! Outputs are passed as [`Any`] so that one interceptor can serve requests
//! of every output type. Use [`Any::downcast_mut`] to act on specific types.

mod bearer;
mod default_headers;
mod retry;

use std::{any::Any, fmt, pin::Pin, sync::Arc};

use crate::{
    BoxedError,
    platform::{MaybeSend, MaybeSendFuture, MaybeSendSync},
    request::RequestParts,
    session::SessionError,
};

pub use bearer::BearerAuth;
pub use default_headers::DefaultHeaders;
pub use retry::SharedBackoffRetry;

/// Hooks invoked by a [`Session`](crate::session::Session) for every request.
///
/// Every method has a default that leaves the request and its outcome
/// untouched, so implementations only override what they need.
pub trait Interceptor: MaybeSendSync {
    /// Rewrites a request before it is translated to the wire.
    ///
    /// Called before every attempt, including retries.
    fn adapt_request(
        &self,
        parts: RequestParts,
    ) -> impl Future<Output = RequestParts> + MaybeSend {
        std::future::ready(parts)
    }

    /// Decides whether a failed attempt should be retried.
    ///
    /// Only transport failures and unsuccessful responses are offered for
    /// rescue. The interceptor may wait (or refresh credentials) before
    /// answering.
    fn should_rescue(
        &self,
        parts: &RequestParts,
        error: &SessionError,
    ) -> impl Future<Output = bool> + MaybeSend {
        let _ = (parts, error);
        std::future::ready(false)
    }

    /// Post-processes a decoded output in place.
    ///
    /// # Errors
    ///
    /// An error rejects the output; the request then fails with
    /// [`SessionError::AdaptOutput`].
    fn adapt_output(&self, output: &mut dyn Any, parts: &RequestParts) -> Result<(), BoxedError> {
        let _ = (output, parts);
        Ok(())
    }

    /// Observes the final result of a request.
    ///
    /// Called exactly once per request, with the request as adapted before
    /// its first attempt.
    fn received_response(&self, result: Result<&dyn Any, &SessionError>, parts: &RequestParts) {
        let _ = (result, parts);
    }
}

impl<I: Interceptor> Interceptor for Arc<I> {
    fn adapt_request(
        &self,
        parts: RequestParts,
    ) -> impl Future<Output = RequestParts> + MaybeSend {
        (**self).adapt_request(parts)
    }

    fn should_rescue(
        &self,
        parts: &RequestParts,
        error: &SessionError,
    ) -> impl Future<Output = bool> + MaybeSend {
        (**self).should_rescue(parts, error)
    }

    fn adapt_output(&self, output: &mut dyn Any, parts: &RequestParts) -> Result<(), BoxedError> {
        (**self).adapt_output(output, parts)
    }

    fn received_response(&self, result: Result<&dyn Any, &SessionError>, parts: &RequestParts) {
        (**self).received_response(result, parts);
    }
}

/// A type-erased interceptor.
#[derive(Clone)]
pub struct BoxedInterceptor {
    inner: Arc<dyn DynInterceptor>,
}

impl BoxedInterceptor {
    /// Boxes an interceptor.
    pub fn new<I: Interceptor + 'static>(interceptor: I) -> Self {
        Self {
            inner: Arc::new(interceptor),
        }
    }
}

impl fmt::Debug for BoxedInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedInterceptor").finish_non_exhaustive()
    }
}

trait DynInterceptor: MaybeSendSync {
    fn dyn_adapt_request(
        &self,
        parts: RequestParts,
    ) -> Pin<Box<dyn MaybeSendFuture<Output = RequestParts> + '_>>;

    fn dyn_should_rescue<'a>(
        &'a self,
        parts: &'a RequestParts,
        error: &'a SessionError,
    ) -> Pin<Box<dyn MaybeSendFuture<Output = bool> + 'a>>;

    fn dyn_adapt_output(&self, output: &mut dyn Any, parts: &RequestParts) -> Result<(), BoxedError>;

    fn dyn_received_response(&self, result: Result<&dyn Any, &SessionError>, parts: &RequestParts);
}

impl<I: Interceptor> DynInterceptor for I {
    fn dyn_adapt_request(
        &self,
        parts: RequestParts,
    ) -> Pin<Box<dyn MaybeSendFuture<Output = RequestParts> + '_>> {
        Box::pin(Interceptor::adapt_request(self, parts))
    }

    fn dyn_should_rescue<'a>(
        &'a self,
        parts: &'a RequestParts,
        error: &'a SessionError,
    ) -> Pin<Box<dyn MaybeSendFuture<Output = bool> + 'a>> {
        Box::pin(Interceptor::should_rescue(self, parts, error))
    }

    fn dyn_adapt_output(&self, output: &mut dyn Any, parts: &RequestParts) -> Result<(), BoxedError> {
        Interceptor::adapt_output(self, output, parts)
    }

    fn dyn_received_response(&self, result: Result<&dyn Any, &SessionError>, parts: &RequestParts) {
        Interceptor::received_response(self, result, parts);
    }
}

impl Interceptor for BoxedInterceptor {
    async fn adapt_request(&self, parts: RequestParts) -> RequestParts {
        self.inner.dyn_adapt_request(parts).await
    }

    async fn should_rescue(&self, parts: &RequestParts, error: &SessionError) -> bool {
        self.inner.dyn_should_rescue(parts, error).await
    }

    fn adapt_output(&self, output: &mut dyn Any, parts: &RequestParts) -> Result<(), BoxedError> {
        self.inner.dyn_adapt_output(output, parts)
    }

    fn received_response(&self, result: Result<&dyn Any, &SessionError>, parts: &RequestParts) {
        self.inner.dyn_received_response(result, parts);
    }
}

/// An ordered chain of interceptors.
///
/// - Requests are adapted by every member in registration order.
/// - A failure is rescued if any member agrees; members after the first
///   one that agrees are not asked.
/// - Outputs are adapted by every member in order. The first error stops
///   the chain.
/// - Every member observes the final result, in order.
///
/// An empty chain leaves everything untouched.
#[derive(Debug, Clone, Default)]
pub struct Interceptors {
    members: Vec<BoxedInterceptor>,
}

impl Interceptors {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chain with `interceptor` appended.
    #[must_use]
    pub fn with<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.push(interceptor);
        self
    }

    /// Appends `interceptor` to the chain.
    pub fn push<I: Interceptor + 'static>(&mut self, interceptor: I) {
        self.members.push(BoxedInterceptor::new(interceptor));
    }

    /// The number of interceptors in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the chain has no interceptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<BoxedInterceptor> for Interceptors {
    fn from_iter<T: IntoIterator<Item = BoxedInterceptor>>(iter: T) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

impl Interceptor for Interceptors {
    async fn adapt_request(&self, mut parts: RequestParts) -> RequestParts {
        for member in &self.members {
            parts = member.adapt_request(parts).await;
        }
        parts
    }

    async fn should_rescue(&self, parts: &RequestParts, error: &SessionError) -> bool {
        for member in &self.members {
            if member.should_rescue(parts, error).await {
                return true;
            }
        }
        false
    }

    fn adapt_output(&self, output: &mut dyn Any, parts: &RequestParts) -> Result<(), BoxedError> {
        for member in &self.members {
            member.adapt_output(output, parts)?;
        }
        Ok(())
    }

    fn received_response(&self, result: Result<&dyn Any, &SessionError>, parts: &RequestParts) {
        for member in &self.members {
            member.received_response(result, parts);
        }
    }
}
