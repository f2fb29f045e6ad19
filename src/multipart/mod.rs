//! `multipart/form-data` request bodies.
//!
//! A [`MultipartFormData`] is an ordered list of [`BodyPart`]s separated by a
//! boundary token. Part content is either held in memory or read from a
//! [`StreamSource`] when the body is encoded, so a form can be re-encoded
//! when a request is retried.

mod encoder;
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
mod file;

use std::{borrow::Cow, fmt, fmt::Write as _, path::PathBuf, pin::Pin, sync::Arc};

use bon::bon;
use bytes::Bytes;
use futures::future::BoxFuture;
use rand::RngExt as _;
use snafu::Snafu;
use tokio::io::AsyncRead;

use crate::header::{CONTENT_DISPOSITION, CONTENT_TYPE, ContentType, HeaderName};

pub(crate) use encoder::encode;
#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
pub use file::FileSource;

/// A reader over the content of one part.
pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// Opens the content of a streamed part.
///
/// The source is opened each time the form is encoded, and the reader is
/// dropped as soon as that part has been read.
pub trait StreamSource: fmt::Debug + Send + Sync {
    /// Opens a fresh reader over the content.
    fn open(&self) -> BoxFuture<'_, std::io::Result<BoxedReader>>;
}

/// The content of a [`BodyPart`].
#[derive(Debug, Clone)]
pub(crate) enum Content {
    Bytes(Bytes),
    Stream(Arc<dyn StreamSource>),
}

/// One named field or file of a multipart form.
#[derive(Debug, Clone)]
pub struct BodyPart {
    name: String,
    headers: Vec<(HeaderName, String)>,
    content: Content,
    length: u64,
}

impl BodyPart {
    fn new(
        name: String,
        file_name: Option<&str>,
        mime_type: Option<String>,
        content: Content,
        length: u64,
    ) -> Self {
        let mut disposition = format!("form-data; name=\"{}\"", escape_quoted(&name));
        if let Some(file_name) = file_name {
            let _ = write!(disposition, "; filename=\"{}\"", escape_quoted(file_name));
        }

        let mut headers = vec![(CONTENT_DISPOSITION, disposition)];
        if let Some(mime_type) = mime_type {
            headers.push((CONTENT_TYPE, mime_type));
        }

        Self {
            name,
            headers,
            content,
            length,
        }
    }

    /// The field name of this part.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The part headers, in the order they are written.
    #[must_use]
    pub fn headers(&self) -> &[(HeaderName, String)] {
        &self.headers
    }

    /// The declared content length in bytes.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }
}

/// A `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartFormData {
    boundary: String,
    body_parts: Vec<BodyPart>,
}

impl Default for MultipartFormData {
    fn default() -> Self {
        Self::new()
    }
}

#[bon]
impl MultipartFormData {
    /// Creates an empty form with a randomly generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(random_boundary())
    }

    /// Creates an empty form using `boundary`.
    ///
    /// The boundary must not appear in any part's content; encoding fails
    /// otherwise.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body_parts: Vec::new(),
        }
    }

    /// The boundary token separating parts.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The parts, in encoding order.
    #[must_use]
    pub fn body_parts(&self) -> &[BodyPart] {
        &self.body_parts
    }

    /// The `Content-Type` of a request carrying this form.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::multipart(&self.boundary)
    }

    /// Adds an in-memory part.
    ///
    /// Without a file name or mime type, only `Content-Disposition` is written.
    #[builder]
    pub fn add_bytes(
        &mut self,
        #[builder(start_fn, into)] data: Bytes,
        #[builder(start_fn, into)] name: String,
        #[builder(into)] file_name: Option<String>,
        #[builder(into)] mime_type: Option<String>,
    ) {
        let length = data.len() as u64;
        self.body_parts.push(BodyPart::new(
            name,
            file_name.as_deref(),
            mime_type,
            Content::Bytes(data),
            length,
        ));
    }

    /// Adds a part whose content is read from `source` during encoding.
    ///
    /// `length` is the exact number of bytes the source yields; encoding
    /// fails if it yields a different amount.
    #[builder]
    pub fn add_stream<S: StreamSource + 'static>(
        &mut self,
        #[builder(start_fn)] source: S,
        #[builder(start_fn)] length: u64,
        #[builder(start_fn, into)] name: String,
        #[builder(into)] file_name: Option<String>,
        #[builder(into)] mime_type: Option<String>,
    ) {
        self.body_parts.push(BodyPart::new(
            name,
            file_name.as_deref(),
            mime_type,
            Content::Stream(Arc::new(source)),
            length,
        ));
    }
}

#[cfg(not(all(target_arch = "wasm32", any(target_os = "unknown", target_os = "none"))))]
#[bon]
impl MultipartFormData {
    /// Adds a part read from the file at `path`.
    ///
    /// The file name defaults to the last path component and the mime type
    /// is derived from the extension when not given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's metadata cannot be read or if the path
    /// is not a regular file.
    #[builder]
    pub fn add_file(
        &mut self,
        #[builder(start_fn, into)] path: PathBuf,
        #[builder(start_fn, into)] name: String,
        #[builder(into)] file_name: Option<String>,
        #[builder(into)] mime_type: Option<String>,
    ) -> Result<(), MultipartError> {
        let (source, length) = FileSource::inspect(path)?;

        let file_name = file_name.or_else(|| source.file_name());
        let mime_type = mime_type.or_else(|| {
            source
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| mime_type_for_extension(ext).to_owned())
        });

        self.body_parts.push(BodyPart::new(
            name,
            file_name.as_deref(),
            mime_type,
            Content::Stream(Arc::new(source)),
            length,
        ));
        Ok(())
    }
}

/// Errors that can occur when building or encoding a multipart form.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MultipartError {
    /// The file backing a part could not be inspected.
    #[snafu(display("Failed to read metadata of '{}'", path.display()))]
    FileMetadata {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The path backing a part is not a regular file.
    #[snafu(display("'{}' is not a file", path.display()))]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },
    /// The content source of a part could not be opened.
    #[snafu(display("Failed to open content of part '{name}'"))]
    StreamOpen {
        /// The part name.
        name: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// Reading the content of a part failed mid-stream.
    #[snafu(display("Failed to read content of part '{name}'"))]
    StreamRead {
        /// The part name.
        name: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// A part yielded a different number of bytes than declared.
    #[snafu(display(
        "Part '{name}' declared {expected} bytes but {actual} bytes were read"
    ))]
    LengthMismatch {
        /// The part name.
        name: String,
        /// The declared length.
        expected: u64,
        /// The number of bytes actually read.
        actual: u64,
    },
    /// A part yielded more bytes than declared.
    ///
    /// Reading stops one byte past the declared length.
    #[snafu(display("Part '{name}' yielded more than the declared {expected} bytes"))]
    LengthExceeded {
        /// The part name.
        name: String,
        /// The declared length.
        expected: u64,
    },
    /// A part header value cannot be written into the form.
    #[snafu(display("Invalid value for header '{header}' of part '{name}'"))]
    InvalidPartHeader {
        /// The part name.
        name: String,
        /// The offending header.
        header: HeaderName,
        /// The underlying error.
        source: crate::header::InvalidHeaderValue,
    },
    /// The boundary token occurs inside a part's content.
    #[snafu(display("Content of part '{name}' contains the form boundary"))]
    BoundaryInContent {
        /// The part name.
        name: String,
    },
}

impl crate::Error for MultipartError {
    fn is_retryable(&self) -> bool {
        false
    }
}

// Percent-encodes the characters that would end a quoted parameter.
fn escape_quoted(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\r', '\n']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace('"', "%22")
            .replace('\r', "%0D")
            .replace('\n', "%0A"),
    )
}

fn random_boundary() -> String {
    let mut bytes = [0u8; 8];
    rand::rng().fill(&mut bytes[..]);

    let mut boundary = String::from("simplehttp.boundary.");
    for b in bytes {
        let _ = write!(boundary, "{b:02x}");
    }
    boundary
}

/// Returns the mime type conventionally associated with a file extension.
pub(crate) fn mime_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}
