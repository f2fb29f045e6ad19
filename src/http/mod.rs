//! HTTP transport abstractions.
//!
//! The session never talks to the network itself. It hands a fully built
//! [`http::Request`] to an [`HttpClient`] and reads the outcome through
//! [`HttpResponse`]. With the `http-client-reqwest-0_13` feature both traits
//! are implemented for `reqwest`; tests and alternative stacks provide their
//! own.

#[cfg(all(not(target_arch = "wasm32"), feature = "http-client-reqwest-0_13"))]
mod reqwest_0_13;

use std::convert::Infallible;

use bytes::Bytes;
use http::{HeaderMap, Request, Response, StatusCode};

use crate::platform::{MaybeSend, MaybeSendSync};

/// Executes wire requests.
pub trait HttpClient: MaybeSendSync {
    /// The error type returned by the client for a failed request.
    type Error: crate::Error;

    /// The associated response type returned by this HTTP client.
    type Response: HttpResponse;

    /// Executes an HTTP request.
    ///
    /// The request's extensions may carry a [`CachePolicy`](crate::request::CachePolicy)
    /// hint. Clients that have no cache ignore it.
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + MaybeSend;
}

/// A response returned by an [`HttpClient`].
pub trait HttpResponse: MaybeSendSync {
    /// The error type when getting the response body.
    type Error: crate::Error;

    /// Returns the HTTP status code of the response.
    fn status(&self) -> StatusCode;

    /// Returns the response's HTTP headers.
    fn headers(&self) -> HeaderMap;

    /// Consumes the response and reads its full body.
    fn body(self) -> impl Future<Output = Result<Bytes, Self::Error>> + MaybeSend;
}

impl HttpResponse for Response<Bytes> {
    type Error = Infallible;

    fn status(&self) -> StatusCode {
        self.status()
    }

    fn headers(&self) -> HeaderMap {
        self.headers().clone()
    }

    async fn body(self) -> Result<Bytes, Self::Error> {
        Ok(self.into_body())
    }
}
