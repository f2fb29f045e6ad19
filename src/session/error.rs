use bytes::Bytes;
use http::StatusCode;
use snafu::Snafu;

use crate::{BoxedError, request::RequestError};

/// Errors returned by a [`Session`](super::Session).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    /// The request could not be turned into a wire request.
    ///
    /// Nothing was sent. Never offered for rescue.
    #[snafu(display("Failed to build request"))]
    Request {
        /// The underlying error.
        source: RequestError,
    },
    /// The transport failed to deliver the request or read the response.
    #[snafu(display("Failed to send request"))]
    Transport {
        /// The transport's error.
        source: BoxedError,
    },
    /// The server answered with a non-2xx status.
    #[snafu(display("Request failed with status {status}"))]
    Http {
        /// The response status.
        status: StatusCode,
        /// The response body.
        body: Bytes,
    },
    /// The server answered with a non-2xx status and a body the configured
    /// error converter recognized.
    #[snafu(display("Request failed with status {status}"))]
    Domain {
        /// The response status.
        status: StatusCode,
        /// The converted error.
        source: BoxedError,
    },
    /// A successful response body did not decode into the expected output.
    ///
    /// Never offered for rescue.
    #[snafu(display("Failed to decode response body"))]
    Decode {
        /// The decoder's error.
        source: BoxedError,
    },
    /// An interceptor rejected the decoded output.
    #[snafu(display("Interceptor rejected the response"))]
    AdaptOutput {
        /// The interceptor's error.
        source: BoxedError,
    },
}

impl SessionError {
    /// The response status, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } | Self::Domain { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if interceptors are asked whether to retry this error.
    #[must_use]
    pub fn is_rescuable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Http { .. } | Self::Domain { .. }
        )
    }

    /// Returns the domain error as `E`, if the error converter produced one
    /// of that type.
    #[must_use]
    pub fn domain_error<E: crate::Error>(&self) -> Option<&E> {
        match self {
            Self::Domain { source, .. } => source.downcast_ref(),
            _ => None,
        }
    }
}

impl crate::Error for SessionError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source } | Self::Domain { source, .. } => source.is_retryable(),
            Self::Http { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Request { .. } | Self::Decode { .. } | Self::AdaptOutput { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error as _;

    fn http(status: StatusCode) -> SessionError {
        SessionError::Http {
            status,
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_http_retryability() {
        assert!(http(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(http(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!http(StatusCode::UNAUTHORIZED).is_retryable());
        assert!(http(StatusCode::UNAUTHORIZED).is_rescuable());
    }

    #[test]
    fn test_status() {
        assert_eq!(
            http(StatusCode::NOT_FOUND).status(),
            Some(StatusCode::NOT_FOUND)
        );

        let decode = SessionError::Decode {
            source: BoxedError::from_err(
                serde_json::from_slice::<u32>(b"nope").unwrap_err(),
            ),
        };
        assert_eq!(decode.status(), None);
        assert!(!decode.is_rescuable());
    }
}
