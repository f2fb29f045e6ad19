//! Typed header keys and content types.
//!
//! Header keys are the [`http::HeaderName`] constants rather than free-form
//! strings, so a typo is a compile error and comparisons are
//! case-insensitive.

use std::{borrow::Cow, fmt};

pub use http::header::{
    ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
    InvalidHeaderValue,
};

/// The value of a `Content-Type` (or `Accept`) header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    /// `application/json`
    pub const JSON: Self = Self(Cow::Borrowed("application/json"));
    /// `application/octet-stream`
    pub const OCTET_STREAM: Self = Self(Cow::Borrowed("application/octet-stream"));
    /// `application/x-www-form-urlencoded`
    pub const FORM_URLENCODED: Self = Self(Cow::Borrowed("application/x-www-form-urlencoded"));
    /// `text/plain`
    pub const TEXT_PLAIN: Self = Self(Cow::Borrowed("text/plain"));

    /// Creates a content type from an arbitrary media type.
    pub fn new(value: impl Into<Cow<'static, str>>) -> Self {
        Self(value.into())
    }

    /// `multipart/form-data; boundary=<boundary>`
    #[must_use]
    pub fn multipart(boundary: &str) -> Self {
        Self(Cow::Owned(format!("multipart/form-data; boundary={boundary}")))
    }

    /// Returns the media type as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts the content type to a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains characters that are not
    /// allowed in a header.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.0)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ContentType {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for ContentType {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Renders a header name the way it is conventionally written on the wire
/// (`content-disposition` becomes `Content-Disposition`).
pub(crate) fn canonical_name(name: &HeaderName) -> String {
    let mut out = String::with_capacity(name.as_str().len());
    let mut upper = true;
    for c in name.as_str().chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_content_type() {
        assert_eq!(
            ContentType::multipart("abc").as_str(),
            "multipart/form-data; boundary=abc"
        );
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name(&CONTENT_DISPOSITION), "Content-Disposition");
        assert_eq!(canonical_name(&CONTENT_TYPE), "Content-Type");
        assert_eq!(
            canonical_name(&HeaderName::from_static("x-request-id")),
            "X-Request-Id"
        );
    }

    #[test]
    fn test_static_header_value() {
        let value = ContentType::JSON.to_header_value().unwrap();
        assert_eq!(value, "application/json");
    }
}
