//! A validated base address.
//!
//! [`BaseUrl`] is a newtype over [`Url`] that guarantees relative endpoints
//! can be resolved against it. It can be constructed from common string and
//! URL types via [`IntoBaseUrl`].

use std::{convert::Infallible, fmt};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use url::Url;

/// A base address every request endpoint is resolved against.
///
/// Once constructed, it can be freely cloned and shared between sessions
/// without re-validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(Url);

impl Serialize for BaseUrl {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.into_base_url().map_err(serde::de::Error::custom)
    }
}

impl BaseUrl {
    /// Returns the inner [`Url`].
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Consumes the [`BaseUrl`] and returns the inner [`Url`].
    #[must_use]
    pub fn into_url(self) -> Url {
        self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<Url> for BaseUrl {
    type Error = InvalidBaseUrl;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        ensure!(
            !url.cannot_be_a_base(),
            CannotBeABaseSnafu {
                url: url.to_string()
            }
        );
        Ok(Self(url))
    }
}

/// Errors when a value cannot be used as a base address.
#[derive(Debug, Snafu)]
pub enum InvalidBaseUrl {
    /// The value is not a URL.
    #[snafu(display("Failed to parse base URL"))]
    Parse {
        /// The underlying parse error.
        source: url::ParseError,
    },
    /// The URL has no hierarchical path (e.g. `mailto:`), so endpoints cannot be appended.
    #[snafu(display("URL '{url}' cannot be used as a base"))]
    CannotBeABase {
        /// The offending URL.
        url: String,
    },
}

impl crate::Error for InvalidBaseUrl {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Conversion trait for types that can be turned into a [`BaseUrl`].
pub trait IntoBaseUrl {
    /// The error type returned if the conversion fails.
    type Error;

    /// Attempts to convert this value into a [`BaseUrl`].
    fn into_base_url(self) -> Result<BaseUrl, Self::Error>;
}

impl IntoBaseUrl for BaseUrl {
    type Error = Infallible;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        Ok(self)
    }
}

impl IntoBaseUrl for Url {
    type Error = InvalidBaseUrl;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        BaseUrl::try_from(self)
    }
}

impl IntoBaseUrl for &str {
    type Error = InvalidBaseUrl;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        Url::parse(self).context(ParseSnafu)?.into_base_url()
    }
}

impl IntoBaseUrl for String {
    type Error = InvalidBaseUrl;

    fn into_base_url(self) -> Result<BaseUrl, Self::Error> {
        self.as_str().into_base_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_url_is_a_base() {
        let base = "https://example.com/api".into_base_url().unwrap();
        assert_eq!(base.as_url().path(), "/api");
    }

    #[test]
    fn test_mailto_is_rejected() {
        let err = "mailto:someone@example.com".into_base_url().unwrap_err();
        assert!(matches!(err, InvalidBaseUrl::CannotBeABase { .. }));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = "not a url".into_base_url().unwrap_err();
        assert!(matches!(err, InvalidBaseUrl::Parse { .. }));
    }
}
