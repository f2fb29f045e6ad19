use bytes::Bytes;
use http::{
    HeaderName, Uri,
    header::{ACCEPT, CONTENT_TYPE},
};
use snafu::prelude::*;
use url::Url;

use super::{Body, RequestParts};
use crate::{
    BoxedError,
    base_url::BaseUrl,
    coder::ContentEncoder,
    header::{ContentType, InvalidHeaderValue},
    multipart::{self, MultipartError},
};

impl RequestParts {
    /// Translates the parts into a wire request against `base_url`.
    ///
    /// The body is encoded with `encoder` (or as multipart), and `Accept` is
    /// set to `accept` when given. Header precedence, lowest first: the
    /// parts' headers, the body's `Content-Type`, then `Accept`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be resolved against the base
    /// address, or if the body cannot be encoded.
    pub async fn to_http_request<E: ContentEncoder>(
        &self,
        encoder: &E,
        base_url: &BaseUrl,
        accept: Option<&ContentType>,
    ) -> Result<http::Request<Bytes>, RequestError> {
        let url = resolve_endpoint(base_url, &self.endpoint, &self.query.to_query_string())
            .context(InvalidEndpointSnafu {
                endpoint: &self.endpoint,
            })?;
        let uri = Uri::try_from(url.as_str()).context(InvalidUriSnafu { url: url.as_str() })?;

        let (body, content_type) = match &self.body {
            None => (Bytes::new(), None),
            Some(Body::Encodable(value)) => {
                let body = encoder
                    .encode(&**value)
                    .map_err(BoxedError::from_err)
                    .context(EncodeSnafu)?;
                (body, Some(encoder.content_type()))
            }
            Some(Body::Multipart(form)) => {
                let body = multipart::encode(form).await.context(MultipartSnafu)?;
                (body, Some(form.content_type()))
            }
        };

        let (mut parts, ()) = http::Request::new(()).into_parts();
        parts.method = self.method.into();
        parts.uri = uri;
        parts.extensions.insert(self.cache_policy);
        parts.headers.clone_from(&self.headers);

        if let Some(content_type) = content_type {
            parts.headers.insert(
                CONTENT_TYPE,
                content_type
                    .to_header_value()
                    .context(InvalidHeaderValueSnafu { name: CONTENT_TYPE })?,
            );
        }
        if let Some(accept) = accept {
            parts.headers.insert(
                ACCEPT,
                accept
                    .to_header_value()
                    .context(InvalidHeaderValueSnafu { name: ACCEPT })?,
            );
        }

        Ok(http::Request::from_parts(parts, body))
    }
}

/// Appends `endpoint` to the path of `base_url`.
///
/// The base's query and fragment are dropped. The endpoint's own query is
/// kept, followed by `extra_query`.
fn resolve_endpoint(
    base_url: &BaseUrl,
    endpoint: &str,
    extra_query: &str,
) -> Result<Url, EndpointError> {
    match Url::parse(endpoint) {
        Ok(_) => return NotRelativeSnafu.fail(),
        Err(url::ParseError::RelativeUrlWithoutBase) => {}
        Err(source) => return Err(EndpointError::Parse { source }),
    }
    ensure!(!endpoint.starts_with("//"), NotRelativeSnafu);

    let endpoint = endpoint.split_once('#').map_or(endpoint, |(rest, _)| rest);
    let (path, endpoint_query) = endpoint
        .split_once('?')
        .map_or((endpoint, ""), |(path, query)| (path, query));
    ensure!(
        !path.split(['/', '\\']).any(is_dot_segment),
        NotRelativeSnafu
    );

    let mut url = base_url.as_url().clone();
    url.set_fragment(None);
    if !path.is_empty() {
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
    }

    let query = match (endpoint_query.is_empty(), extra_query.is_empty()) {
        (true, true) => None,
        (false, true) => Some(endpoint_query.to_owned()),
        (true, false) => Some(extra_query.to_owned()),
        (false, false) => Some(format!("{endpoint_query}&{extra_query}")),
    };
    url.set_query(query.as_deref());

    Ok(url)
}

// `.` and `..`, including their percent-encoded spellings, which URL
// parsing resolves against the base path.
fn is_dot_segment(segment: &str) -> bool {
    matches!(
        segment.to_ascii_lowercase().as_str(),
        "." | ".." | "%2e" | ".%2e" | "%2e." | "%2e%2e"
    )
}

/// Errors that can occur when turning request parts into a wire request.
#[derive(Debug, Snafu)]
pub enum RequestError {
    /// The endpoint cannot be resolved against the base address.
    #[snafu(display("Invalid endpoint '{endpoint}'"))]
    InvalidEndpoint {
        /// The endpoint as given.
        endpoint: String,
        /// Why it was rejected.
        source: EndpointError,
    },
    /// The resolved URL is not a valid request URI.
    #[snafu(display("Resolved URL '{url}' is not a valid URI"))]
    InvalidUri {
        /// The resolved URL.
        url: String,
        /// The underlying error.
        source: http::uri::InvalidUri,
    },
    /// A header value computed for the request is not valid.
    #[snafu(display("Invalid value for header '{name}'"))]
    InvalidHeaderValue {
        /// The header.
        name: HeaderName,
        /// The underlying error.
        source: InvalidHeaderValue,
    },
    /// The body could not be encoded.
    #[snafu(display("Failed to encode request body"))]
    Encode {
        /// The encoder's error.
        source: BoxedError,
    },
    /// The multipart body could not be encoded.
    #[snafu(display("Failed to encode multipart body"))]
    Multipart {
        /// The underlying error.
        source: MultipartError,
    },
}

impl crate::Error for RequestError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Reasons an endpoint is rejected.
#[derive(Debug, Snafu)]
pub enum EndpointError {
    /// The endpoint is malformed.
    #[snafu(display("Failed to parse endpoint"))]
    Parse {
        /// The underlying parse error.
        source: url::ParseError,
    },
    /// The endpoint names its own scheme or host, or has a `.` or `..`
    /// path segment.
    #[snafu(display("Endpoint must be relative to the base address"))]
    NotRelative,
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use serde::Serialize;

    use super::*;
    use crate::{
        base_url::IntoBaseUrl as _,
        coder::{FormEncoder, JsonEncoder},
        multipart::MultipartFormData,
        query::Query,
        request::{CachePolicy, Method},
    };

    #[derive(Debug, Serialize)]
    struct NewWidget {
        name: &'static str,
    }

    fn base(url: &str) -> BaseUrl {
        url.into_base_url().unwrap()
    }

    fn get(endpoint: &str) -> RequestParts {
        RequestParts::new(Method::Get, endpoint, None::<Body>, Query::new())
    }

    async fn translate(parts: &RequestParts, base_url: &str) -> http::Request<Bytes> {
        parts
            .to_http_request(&JsonEncoder, &base(base_url), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_endpoint_is_appended_to_base_path() {
        for base_url in ["https://x.com/api", "https://x.com/api/", "https://x.com/api?q=1"] {
            let request = translate(&get("widgets"), base_url).await;
            assert_eq!(request.uri(), "https://x.com/api/widgets", "base {base_url}");
        }
    }

    #[tokio::test]
    async fn test_leading_slash_and_endpoint_query() {
        let request = translate(&get("/path"), "https://google.com/lostAndFound").await;
        assert_eq!(request.uri(), "https://google.com/lostAndFound/path");

        let request = translate(
            &get("concatenated?toKeep=1"),
            "https://google.com/lostAndFound?dropped=1",
        )
        .await;
        assert_eq!(
            request.uri(),
            "https://google.com/lostAndFound/concatenated?toKeep=1"
        );
    }

    #[tokio::test]
    async fn test_descriptor_query_follows_endpoint_query() {
        let parts = get("search?fixed=1")
            .with_query_param("tags", [1, 2, 3])
            .with_query_param("q", "a b");

        let request = translate(&parts, "https://x.com").await;

        assert_eq!(
            request.uri(),
            "https://x.com/search?fixed=1&tags[]=1&tags[]=2&tags[]=3&q=a+b"
        );
    }

    #[tokio::test]
    async fn test_absolute_and_scheme_relative_endpoints_are_rejected() {
        for endpoint in ["https://evil.example/steal", "//evil.example/steal"] {
            let err = get(endpoint)
                .to_http_request(&JsonEncoder, &base("https://x.com"), None)
                .await
                .unwrap_err();

            assert!(
                matches!(
                    err,
                    RequestError::InvalidEndpoint {
                        source: EndpointError::NotRelative,
                        ..
                    }
                ),
                "endpoint {endpoint}"
            );
        }
    }

    #[tokio::test]
    async fn test_dot_segments_are_rejected() {
        let rejected = ["../../admin", "a/./b", "users/%2E%2E/admin", "..\\admin", ".."];
        for endpoint in rejected {
            let err = get(endpoint)
                .to_http_request(&JsonEncoder, &base("https://api.example.com/v1"), None)
                .await
                .unwrap_err();

            assert!(
                matches!(
                    err,
                    RequestError::InvalidEndpoint {
                        source: EndpointError::NotRelative,
                        ..
                    }
                ),
                "endpoint {endpoint}"
            );
        }

        let request = translate(
            &get("files/v1..v2?x=..#.."),
            "https://api.example.com/v1",
        )
        .await;
        assert_eq!(
            request.uri(),
            "https://api.example.com/v1/files/v1..v2?x=.."
        );
    }

    #[tokio::test]
    async fn test_method_and_cache_policy() {
        let parts = RequestParts::new(Method::Delete, "items/1", None::<Body>, Query::new())
            .with_cache_policy(CachePolicy::ReturnCacheDontLoad);

        let request = translate(&parts, "https://x.com").await;

        assert_eq!(request.method(), http::Method::DELETE);
        assert_eq!(
            request.extensions().get::<CachePolicy>(),
            Some(&CachePolicy::ReturnCacheDontLoad)
        );
        assert!(request.body().is_empty());
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_encoded_body_sets_content_type() {
        let parts = RequestParts::new(
            Method::Post,
            "widgets",
            Body::encodable(NewWidget { name: "gear" }),
            Query::new(),
        )
        .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let request = parts
            .to_http_request(&FormEncoder, &base("https://x.com"), None)
            .await
            .unwrap();

        assert_eq!(
            request.headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(&request.body()[..], b"name=gear");
    }

    #[tokio::test]
    async fn test_accept_overrides_caller_header() {
        let parts = get("widgets")
            .with_header(ACCEPT, HeaderValue::from_static("text/html"))
            .with_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("abc"),
            );

        let request = parts
            .to_http_request(&JsonEncoder, &base("https://x.com"), Some(&ContentType::JSON))
            .await
            .unwrap();

        assert_eq!(request.headers()[ACCEPT], "application/json");
        assert_eq!(request.headers()["x-request-id"], "abc");
    }

    #[tokio::test]
    async fn test_multipart_body() {
        let mut form = MultipartFormData::with_boundary("boundary");
        form.add_bytes(Bytes::from_static(b"hello"), "greeting")
            .call();
        let parts = RequestParts::new(Method::Post, "upload", Body::from(form), Query::new());

        let request = translate(&parts, "https://x.com").await;

        assert_eq!(
            request.headers()[CONTENT_TYPE],
            "multipart/form-data; boundary=boundary"
        );
        assert!(request.body().starts_with(b"--boundary\r\n"));
        assert!(request.body().ends_with(b"\r\n--boundary--"));
    }

    #[tokio::test]
    async fn test_multipart_failure_is_reported() {
        let mut form = MultipartFormData::with_boundary("b");
        form.add_bytes(Bytes::from_static(b"contains --b"), "bad")
            .call();
        let parts = RequestParts::new(Method::Post, "upload", Body::from(form), Query::new());

        let err = parts
            .to_http_request(&JsonEncoder, &base("https://x.com"), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RequestError::Multipart {
                source: MultipartError::BoundaryInContent { .. }
            }
        ));
    }
}
