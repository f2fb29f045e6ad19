use http::{HeaderValue, header::AUTHORIZATION};
use secrecy::{ExposeSecret as _, SecretString};
use tracing::warn;

use super::Interceptor;
use crate::request::RequestParts;

/// Authenticates every request with a bearer token.
///
/// The `Authorization` header is marked sensitive so it is not printed by
/// `Debug` output of the wire request.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: SecretString,
}

impl BearerAuth {
    /// Creates the interceptor from a token.
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Interceptor for BearerAuth {
    async fn adapt_request(&self, parts: RequestParts) -> RequestParts {
        let Ok(mut value) =
            HeaderValue::from_str(&format!("Bearer {}", self.token.expose_secret()))
        else {
            warn!(
                endpoint = parts.endpoint(),
                "bearer token is not a valid header value; sending request without it"
            );
            return parts;
        };
        value.set_sensitive(true);

        parts.with_header(AUTHORIZATION, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{query::Query, request::{Body, Method}};

    fn parts() -> RequestParts {
        RequestParts::new(Method::Get, "me", None::<Body>, Query::new())
    }

    #[tokio::test]
    async fn test_sets_sensitive_authorization_header() {
        let interceptor = BearerAuth::new("s3cr3t");

        let adapted = interceptor.adapt_request(parts()).await;

        let value = &adapted.headers()[AUTHORIZATION];
        assert_eq!(value, "Bearer s3cr3t");
        assert!(value.is_sensitive());
    }

    #[tokio::test]
    async fn test_invalid_token_leaves_request_unchanged() {
        let interceptor = BearerAuth::new("bad\ntoken");

        let adapted = interceptor.adapt_request(parts()).await;

        assert!(adapted.headers().get(AUTHORIZATION).is_none());
    }
}
