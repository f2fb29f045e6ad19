//! Common imports.
//!
//! ```
//! use simplehttp::prelude::*;
//! ```

pub use crate::base_url::{BaseUrl, IntoBaseUrl as _};
pub use crate::coder::{FormEncoder, JsonDecoder, JsonEncoder};
pub use crate::interceptor::{Interceptor, Interceptors};
pub use crate::multipart::MultipartFormData;
pub use crate::query::Query;
pub use crate::request::{Body, Request};
pub use crate::session::{Session, SessionConfig, SessionError};
