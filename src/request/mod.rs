//! Typed request descriptors.
//!
//! A [`Request<O>`] describes one HTTP call whose successful response decodes
//! into `O`. It carries no behavior: a [`Session`](crate::session::Session)
//! turns it into a wire request. The untyped [`RequestParts`] are what
//! interceptors see and rewrite.

mod wire;

use std::{fmt, marker::PhantomData, sync::Arc};

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::{
    coder::Encodable,
    multipart::MultipartFormData,
    query::{Query, QueryParam},
};

pub use wire::{EndpointError, RequestError};

/// The HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// The method as it is written on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// A request body.
#[derive(Debug, Clone)]
pub enum Body {
    /// A payload serialized by the session's content encoder.
    Encodable(Arc<dyn Encodable>),
    /// A `multipart/form-data` form.
    Multipart(MultipartFormData),
}

impl Body {
    /// Wraps a payload for the session's content encoder.
    pub fn encodable(value: impl Encodable + 'static) -> Self {
        Self::Encodable(Arc::new(value))
    }
}

impl From<MultipartFormData> for Body {
    fn from(form: MultipartFormData) -> Self {
        Self::Multipart(form)
    }
}

/// A caching hint handed to the transport.
///
/// The session does not cache. The policy is inserted into the extensions
/// of the wire request, where a transport may pick it up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CachePolicy {
    /// Let the transport decide.
    #[default]
    Default,
    /// Follow the caching rules of the protocol.
    UseProtocol,
    /// Always load from the origin.
    ReloadIgnoringCache,
    /// Use cached data when present, otherwise load.
    ReturnCacheElseLoad,
    /// Only use cached data, never load.
    ReturnCacheDontLoad,
}

/// The untyped contents of a request.
#[derive(Debug, Clone)]
pub struct RequestParts {
    endpoint: String,
    method: Method,
    body: Option<Body>,
    query: Query,
    headers: HeaderMap,
    cache_policy: CachePolicy,
}

impl RequestParts {
    /// Creates request parts with no headers and the default cache policy.
    pub fn new(
        method: Method,
        endpoint: impl Into<String>,
        body: impl Into<Option<Body>>,
        query: Query,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: body.into(),
            query,
            headers: HeaderMap::new(),
            cache_policy: CachePolicy::Default,
        }
    }

    /// The endpoint, relative to the session's base address.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// The body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// The query parameters.
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The headers set on the request.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The caching hint.
    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    /// Returns the parts with `headers` merged in.
    ///
    /// A header already present is replaced by the values from `headers`.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Returns the parts with `name` set to `value`, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the parts with the given caching hint.
    #[must_use]
    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    /// Returns the parts with the query parameter `name` set to `value`.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl QueryParam) -> Self {
        self.query.set(name, value);
        self
    }

    /// Returns the parts with the body replaced.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Option<Body>>) -> Self {
        self.body = body.into();
        self
    }
}

/// A request whose successful response decodes into `O`.
///
/// Requests are plain values: cloning is cheap relative to sending, and the
/// session never mutates the request it is given.
pub struct Request<O> {
    parts: RequestParts,
    output: PhantomData<fn() -> O>,
}

impl<O> Request<O> {
    /// Wraps untyped parts.
    #[must_use]
    pub fn from_parts(parts: RequestParts) -> Self {
        Self {
            parts,
            output: PhantomData,
        }
    }

    /// A `GET` request.
    pub fn get(endpoint: impl Into<String>, query: Query) -> Self {
        Self::from_parts(RequestParts::new(Method::Get, endpoint, None::<Body>, query))
    }

    /// A `POST` request.
    pub fn post(endpoint: impl Into<String>, body: impl Into<Option<Body>>, query: Query) -> Self {
        Self::from_parts(RequestParts::new(Method::Post, endpoint, body, query))
    }

    /// A `PUT` request.
    pub fn put(endpoint: impl Into<String>, body: impl Into<Option<Body>>, query: Query) -> Self {
        Self::from_parts(RequestParts::new(Method::Put, endpoint, body, query))
    }

    /// A `PATCH` request.
    pub fn patch(endpoint: impl Into<String>, body: impl Into<Option<Body>>, query: Query) -> Self {
        Self::from_parts(RequestParts::new(Method::Patch, endpoint, body, query))
    }

    /// A `DELETE` request.
    pub fn delete(endpoint: impl Into<String>, query: Query) -> Self {
        Self::from_parts(RequestParts::new(Method::Delete, endpoint, None::<Body>, query))
    }

    /// The untyped parts.
    #[must_use]
    pub fn parts(&self) -> &RequestParts {
        &self.parts
    }

    /// Unwraps the untyped parts.
    #[must_use]
    pub fn into_parts(self) -> RequestParts {
        self.parts
    }

    /// See [`RequestParts::with_headers`].
    #[must_use]
    pub fn with_headers(self, headers: HeaderMap) -> Self {
        Self::from_parts(self.parts.with_headers(headers))
    }

    /// See [`RequestParts::with_header`].
    #[must_use]
    pub fn with_header(self, name: HeaderName, value: HeaderValue) -> Self {
        Self::from_parts(self.parts.with_header(name, value))
    }

    /// See [`RequestParts::with_cache_policy`].
    #[must_use]
    pub fn with_cache_policy(self, cache_policy: CachePolicy) -> Self {
        Self::from_parts(self.parts.with_cache_policy(cache_policy))
    }

    /// See [`RequestParts::with_query_param`].
    #[must_use]
    pub fn with_query_param(self, name: impl Into<String>, value: impl QueryParam) -> Self {
        Self::from_parts(self.parts.with_query_param(name, value))
    }
}

// Manual impls so that `O` needs neither `Clone` nor `Debug`.
impl<O> Clone for Request<O> {
    fn clone(&self) -> Self {
        Self::from_parts(self.parts.clone())
    }
}

impl<O> fmt::Debug for Request<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("output", &std::any::type_name::<O>())
            .field("parts", &self.parts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use http::header::ACCEPT;

    use super::*;

    struct NotClone;

    #[test]
    fn test_constructors_set_method_and_body() {
        let get = Request::<()>::get("items", Query::new());
        assert_eq!(get.parts().method(), Method::Get);
        assert!(get.parts().body().is_none());

        let post = Request::<()>::post(
            "items",
            Body::encodable(serde_json::json!({ "name": "widget" })),
            Query::new(),
        );
        assert_eq!(post.parts().method(), Method::Post);
        assert!(matches!(post.parts().body(), Some(Body::Encodable(_))));

        let upload = Request::<()>::put("files", Body::from(MultipartFormData::new()), Query::new());
        assert!(matches!(upload.parts().body(), Some(Body::Multipart(_))));
    }

    #[test]
    fn test_mutators_leave_original_untouched() {
        let original = Request::<NotClone>::get("items", Query::new().param("page", 1));

        let adapted = original
            .clone()
            .with_header(ACCEPT, HeaderValue::from_static("text/plain"))
            .with_query_param("page", 2)
            .with_cache_policy(CachePolicy::ReloadIgnoringCache);

        assert!(original.parts().headers().is_empty());
        assert_eq!(original.parts().query().to_query_string(), "page=1");
        assert_eq!(original.parts().cache_policy(), CachePolicy::Default);

        assert_eq!(adapted.parts().headers()[ACCEPT], "text/plain");
        assert_eq!(adapted.parts().query().to_query_string(), "page=2");
        assert_eq!(
            adapted.parts().cache_policy(),
            CachePolicy::ReloadIgnoringCache
        );
    }

    #[test]
    fn test_header_names_are_case_insensitive_and_last_write_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("second"));

        let parts = RequestParts::new(Method::Get, "items", None::<Body>, Query::new())
            .with_header(
                HeaderName::from_static("x-trace"),
                HeaderValue::from_static("first"),
            )
            .with_headers(headers);

        assert_eq!(parts.headers().len(), 1);
        assert_eq!(parts.headers()["X-Trace"], "second");
    }

    #[test]
    fn test_method_wire_form() {
        assert_eq!(Method::Patch.to_string(), "PATCH");
        assert_eq!(http::Method::from(Method::Delete), http::Method::DELETE);
    }
}
