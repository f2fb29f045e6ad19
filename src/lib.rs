//! Typed HTTP requests over a pluggable transport.
//!
//! A [`Request<O>`](request::Request) describes a call whose successful
//! response decodes into `O`. A [`Session`](session::Session) sends it
//! through an [`HttpClient`](http::HttpClient), running it through a chain
//! of [`Interceptor`](interceptor::Interceptor)s that can rewrite requests,
//! retry failures, adapt outputs and observe results. Request bodies are
//! encoded by a [`ContentEncoder`](coder::ContentEncoder), or as
//! `multipart/form-data` with [`MultipartFormData`](multipart::MultipartFormData).

#![forbid(unsafe_code)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base_url;
pub mod coder;
mod error;
pub mod header;
pub mod http;
pub mod interceptor;
pub mod multipart;
pub mod platform;
pub mod prelude;
pub mod query;
pub mod request;
pub mod session;

pub use error::{BoxedError, Error};

/// Re-export of parts of the `secrecy` crate.
pub mod secrecy {
    pub use ::secrecy::{ExposeSecret, SecretString};
}

pub use bytes::Bytes;
