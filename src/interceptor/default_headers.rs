use http::HeaderMap;

use super::Interceptor;
use crate::request::RequestParts;

/// Adds a fixed set of headers to every request.
///
/// Headers the request already carries are left alone.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: HeaderMap,
}

impl DefaultHeaders {
    /// Creates the interceptor from the headers to add.
    #[must_use]
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }
}

impl Interceptor for DefaultHeaders {
    async fn adapt_request(&self, parts: RequestParts) -> RequestParts {
        let mut missing = HeaderMap::new();
        for (name, value) in &self.headers {
            if !parts.headers().contains_key(name) {
                missing.append(name.clone(), value.clone());
            }
        }
        parts.with_headers(missing)
    }
}

#[cfg(test)]
mod tests {
    use http::{
        HeaderValue,
        header::{ACCEPT_LANGUAGE, USER_AGENT},
    };

    use super::*;
    use crate::{query::Query, request::{Body, Method}};

    #[tokio::test]
    async fn test_request_headers_take_precedence() {
        let mut defaults = HeaderMap::new();
        defaults.insert(USER_AGENT, HeaderValue::from_static("simplehttp"));
        defaults.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        let interceptor = DefaultHeaders::new(defaults);

        let parts = RequestParts::new(Method::Get, "items", None::<Body>, Query::new())
            .with_header(ACCEPT_LANGUAGE, HeaderValue::from_static("fr"));
        let adapted = interceptor.adapt_request(parts).await;

        assert_eq!(adapted.headers()[USER_AGENT], "simplehttp");
        assert_eq!(adapted.headers()[ACCEPT_LANGUAGE], "fr");
    }
}
