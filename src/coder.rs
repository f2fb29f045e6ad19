//! Body encoders and decoders.
//!
//! A request body is carried type-erased as an [`Encodable`]. Payloads are
//! lowered to serde's self-describing data model (a [`serde_json::Value`],
//! order-preserving) so that any [`ContentEncoder`] can serialize them
//! without knowing the concrete payload type.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use snafu::prelude::*;

use crate::{BoxedError, header::ContentType, platform::MaybeSendSync};

/// A request payload that can be handed to any [`ContentEncoder`].
///
/// Implemented for every `Serialize` type.
pub trait Encodable: fmt::Debug + MaybeSendSync {
    /// Lowers the payload to serde's data model.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload's `Serialize` implementation fails.
    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<T: Serialize + fmt::Debug + MaybeSendSync> Encodable for T {
    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Encodes request bodies.
pub trait ContentEncoder: MaybeSendSync {
    /// The error type when encoding fails.
    type Error: crate::Error;

    /// The content type of the bytes this encoder produces.
    fn content_type(&self) -> ContentType;

    /// Encodes `value` into the request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented in this format.
    fn encode(&self, value: &dyn Encodable) -> Result<Bytes, Self::Error>;
}

/// Decodes response bodies.
pub trait ContentDecoder: MaybeSendSync {
    /// The error type when decoding fails.
    type Error: crate::Error;

    /// The content type this decoder accepts.
    fn content_type(&self) -> ContentType;

    /// Decodes `bytes` into a `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not match the shape of `T`.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, Self::Error>;
}

/// JSON request bodies (`application/json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl ContentEncoder for JsonEncoder {
    type Error = serde_json::Error;

    fn content_type(&self) -> ContentType {
        ContentType::JSON
    }

    fn encode(&self, value: &dyn Encodable) -> Result<Bytes, Self::Error> {
        serde_json::to_vec(&value.to_value()?).map(Bytes::from)
    }
}

/// JSON response bodies (`application/json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ContentDecoder for JsonDecoder {
    type Error = serde_json::Error;

    fn content_type(&self) -> ContentType {
        ContentType::JSON
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

/// URL-encoded form request bodies (`application/x-www-form-urlencoded`).
///
/// Only flat payloads (structs or maps of scalars and sequences of scalars)
/// can be encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormEncoder;

impl ContentEncoder for FormEncoder {
    type Error = FormEncodeError;

    fn content_type(&self) -> ContentType {
        ContentType::FORM_URLENCODED
    }

    fn encode(&self, value: &dyn Encodable) -> Result<Bytes, Self::Error> {
        let value = value.to_value().context(LowerSnafu)?;
        let body = serde_html_form::to_string(&value).context(SerializeFormSnafu)?;
        Ok(Bytes::from(body))
    }
}

/// Errors that can occur when encoding a form body.
#[derive(Debug, Snafu)]
pub enum FormEncodeError {
    /// The payload's `Serialize` implementation failed.
    #[snafu(display("Failed to serialize payload"))]
    Lower {
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The payload is not representable as a flat form.
    #[snafu(display("Failed to encode payload as a form"))]
    SerializeForm {
        /// The underlying error.
        source: serde_html_form::ser::Error,
    },
}

impl crate::Error for FormEncodeError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Turns the body of a failed response into a domain error.
///
/// The converter gets the first chance to explain a non-2xx response with
/// a non-empty body. Returning `None` keeps the plain HTTP status error.
#[derive(Clone)]
pub struct ErrorConverter {
    convert: Arc<dyn Fn(&[u8]) -> Option<BoxedError> + Send + Sync>,
}

impl ErrorConverter {
    /// Creates a converter from a function.
    pub fn new(convert: impl Fn(&[u8]) -> Option<BoxedError> + Send + Sync + 'static) -> Self {
        Self {
            convert: Arc::new(convert),
        }
    }

    /// Creates a converter that decodes the body into the error type `E`.
    ///
    /// Bodies that do not decode into `E` are left to the plain HTTP error.
    pub fn decoding<E, D>(decoder: D) -> Self
    where
        E: DeserializeOwned + crate::Error,
        D: ContentDecoder + Send + Sync + 'static,
    {
        Self::new(move |body| decoder.decode::<E>(body).ok().map(BoxedError::from_err))
    }

    /// Converts `body`, if this converter recognizes it.
    #[must_use]
    pub fn convert(&self, body: &[u8]) -> Option<BoxedError> {
        (self.convert)(body)
    }
}

impl fmt::Debug for ErrorConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorConverter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Serialize)]
    struct Payload {
        zeta: u32,
        alpha: &'static str,
    }

    #[derive(Debug, Deserialize, Snafu)]
    #[snafu(display("api error {code}"))]
    struct ApiError {
        code: String,
    }

    impl crate::Error for ApiError {
        fn is_retryable(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_json_keeps_field_order() {
        let body = JsonEncoder
            .encode(&Payload {
                zeta: 1,
                alpha: "a",
            })
            .unwrap();

        assert_eq!(&body[..], br#"{"zeta":1,"alpha":"a"}"#);
    }

    #[test]
    fn test_form_encoder() {
        let body = FormEncoder
            .encode(&Payload {
                zeta: 1,
                alpha: "a b",
            })
            .unwrap();

        assert_eq!(&body[..], b"zeta=1&alpha=a+b");
    }

    #[test]
    fn test_form_encoder_rejects_nested_payloads() {
        let nested = serde_json::json!({ "outer": { "inner": 1 } });
        let result = FormEncoder.encode(&nested);

        assert!(matches!(result, Err(FormEncodeError::SerializeForm { .. })));
    }

    #[test]
    fn test_decoding_converter() {
        let converter = ErrorConverter::decoding::<ApiError, _>(JsonDecoder);

        let error = converter.convert(br#"{"code":"E42"}"#).unwrap();
        assert_eq!(error.downcast_ref::<ApiError>().unwrap().code, "E42");

        assert!(converter.convert(b"<html>").is_none());
    }
}
