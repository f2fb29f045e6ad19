//! The request pipeline.
//!
//! A [`Session`] binds a base address, a [`SessionConfig`] and an
//! [`HttpClient`]. For every call it:
//!
//! 1. adapts the request through the configured [`Interceptors`],
//! 2. translates it to a wire request and sends it,
//! 3. validates the status, turning failures into a [`SessionError`],
//! 4. on a transport or status failure, asks the interceptors whether to
//!    retry, and if so starts over from step 1 with the adapted request,
//! 5. decodes the body and lets the interceptors adapt the output,
//! 6. reports the final result to the interceptors, exactly once.

mod error;

use std::any::Any;

use bon::Builder;
use bytes::Bytes;
use futures::{Stream, stream};
use serde::de::DeserializeOwned;
use snafu::prelude::*;
use tracing::{Instrument as _, debug, debug_span, warn};

use crate::{
    BoxedError,
    base_url::BaseUrl,
    coder::{ContentDecoder, ContentEncoder, ErrorConverter, JsonDecoder, JsonEncoder},
    http::{HttpClient, HttpResponse},
    interceptor::{Interceptor, Interceptors},
    request::{Request, RequestParts},
};

pub use error::SessionError;
use error::{AdaptOutputSnafu, DecodeSnafu, HttpSnafu, RequestSnafu, TransportSnafu};

/// How a [`Session`] encodes, decodes and intercepts requests.
#[derive(Debug, Clone, Builder)]
pub struct SessionConfig<E, D> {
    /// Encodes request bodies.
    encoder: E,
    /// Decodes response bodies. Its content type is sent as `Accept`.
    decoder: D,
    /// The interceptor chain. Empty by default.
    #[builder(default)]
    interceptors: Interceptors,
    /// Converts the body of failed responses into domain errors.
    error_converter: Option<ErrorConverter>,
    /// The maximum number of rescues per call. Unbounded when unset.
    rescue_limit: Option<u32>,
}

impl Default for SessionConfig<JsonEncoder, JsonDecoder> {
    fn default() -> Self {
        Self::builder()
            .encoder(JsonEncoder)
            .decoder(JsonDecoder)
            .build()
    }
}

impl<E, D> SessionConfig<E, D> {
    /// The request body encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// The response body decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// The interceptor chain.
    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    /// The error converter, if any.
    pub fn error_converter(&self) -> Option<&ErrorConverter> {
        self.error_converter.as_ref()
    }

    /// The maximum number of rescues per call, if bounded.
    pub fn rescue_limit(&self) -> Option<u32> {
        self.rescue_limit
    }
}

/// Sends [`Request`]s to one base address.
///
/// A session holds no per-call state, so it can be shared (e.g. in an
/// `Arc`) and used for concurrent calls.
#[derive(Debug, Clone)]
pub struct Session<C, E, D> {
    base_url: BaseUrl,
    config: SessionConfig<E, D>,
    http_client: C,
}

impl<C: HttpClient, E: ContentEncoder, D: ContentDecoder> Session<C, E, D> {
    /// Creates a session.
    pub fn new(base_url: BaseUrl, config: SessionConfig<E, D>, http_client: C) -> Self {
        Self {
            base_url,
            config,
            http_client,
        }
    }

    /// The base address endpoints are resolved against.
    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig<E, D> {
        &self.config
    }

    /// The transport.
    pub fn http_client(&self) -> &C {
        &self.http_client
    }

    /// Sends `request` and decodes the response into `O`.
    ///
    /// The request itself is not modified; interceptors work on a copy.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt if the request fails and no
    /// interceptor rescues it, or if decoding or output adaptation fails.
    pub async fn response<O: DeserializeOwned + 'static>(
        &self,
        request: &Request<O>,
    ) -> Result<O, SessionError> {
        let span = request_span(request.parts());
        async {
            let (first, fetched) = self.fetch(request.parts().clone()).await;
            let result = fetched.and_then(|(parts, body)| self.output::<O>(&body, &parts));
            self.config.interceptors.received_response(
                result.as_ref().map(|output| output as &dyn Any),
                &first,
            );
            result
        }
        .instrument(span)
        .await
    }

    /// Sends `request`, discarding the response body.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt if the request fails and no
    /// interceptor rescues it.
    pub async fn send(&self, request: &Request<()>) -> Result<(), SessionError> {
        let span = request_span(request.parts());
        async {
            let (first, fetched) = self.fetch(request.parts().clone()).await;
            let result = fetched.map(|_| ());
            self.config.interceptors.received_response(
                result.as_ref().map(|output| output as &dyn Any),
                &first,
            );
            result
        }
        .instrument(span)
        .await
    }

    /// Sends `request` as a stream that yields the result and then ends.
    pub fn response_stream<O: DeserializeOwned + 'static>(
        &self,
        request: Request<O>,
    ) -> impl Stream<Item = Result<O, SessionError>> + '_ {
        stream::once(async move { self.response(&request).await })
    }

    /// Runs attempts until one succeeds or a failure is not rescued.
    ///
    /// Returns the request as adapted for the first attempt, and either the
    /// successful attempt's request and body or the last error.
    async fn fetch(
        &self,
        parts: RequestParts,
    ) -> (RequestParts, Result<(RequestParts, Bytes), SessionError>) {
        let interceptors = &self.config.interceptors;
        let mut parts = interceptors.adapt_request(parts).await;
        let first = parts.clone();
        let mut rescues = 0_u32;

        loop {
            let error = match self.attempt(&parts).await {
                Ok(body) => return (first, Ok((parts, body))),
                Err(error) => error,
            };
            warn!(error = %error, status = ?error.status(), "request attempt failed");

            if !error.is_rescuable() {
                return (first, Err(error));
            }
            if let Some(limit) = self.config.rescue_limit
                && rescues >= limit
            {
                warn!(limit, "rescue limit reached");
                return (first, Err(error));
            }
            if !interceptors.should_rescue(&parts, &error).await {
                return (first, Err(error));
            }

            rescues += 1;
            debug!(rescues, "rescuing request");
            parts = interceptors.adapt_request(parts).await;
        }
    }

    /// Translates, sends and validates one attempt.
    async fn attempt(&self, parts: &RequestParts) -> Result<Bytes, SessionError> {
        let accept = self.config.decoder.content_type();
        let request = parts
            .to_http_request(&self.config.encoder, &self.base_url, Some(&accept))
            .await
            .context(RequestSnafu)?;

        debug!(method = %request.method(), uri = %request.uri(), "sending request");
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(BoxedError::from_err)
            .context(TransportSnafu)?;

        let status = response.status();
        let body = response
            .body()
            .await
            .map_err(BoxedError::from_err)
            .context(TransportSnafu)?;
        debug!(%status, bytes = body.len(), "received response");

        if status.is_success() {
            return Ok(body);
        }

        if !body.is_empty()
            && let Some(converter) = &self.config.error_converter
            && let Some(source) = converter.convert(&body)
        {
            return Err(SessionError::Domain { status, source });
        }

        HttpSnafu { status, body }.fail()
    }

    fn output<O: DeserializeOwned + 'static>(
        &self,
        body: &[u8],
        parts: &RequestParts,
    ) -> Result<O, SessionError> {
        let mut output: O = self
            .config
            .decoder
            .decode(body)
            .map_err(BoxedError::from_err)
            .context(DecodeSnafu)?;

        self.config
            .interceptors
            .adapt_output(&mut output, parts)
            .context(AdaptOutputSnafu)?;

        Ok(output)
    }
}

fn request_span(parts: &RequestParts) -> tracing::Span {
    debug_span!(
        "request",
        method = %parts.method(),
        endpoint = parts.endpoint(),
    )
}
