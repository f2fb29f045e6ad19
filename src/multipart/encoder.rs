use bytes::{BufMut as _, Bytes, BytesMut};
use snafu::prelude::*;
use tokio::io::AsyncReadExt as _;
use tracing::trace;

use super::{
    BodyPart, BoundaryInContentSnafu, Content, InvalidPartHeaderSnafu, LengthExceededSnafu,
    LengthMismatchSnafu, MultipartError, MultipartFormData, StreamOpenSnafu, StreamReadSnafu,
};
use crate::header::{HeaderValue, canonical_name};

const CRLF: &str = "\r\n";

// Streams are drained in chunks of this size.
const STREAM_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundaryKind {
    Initial,
    Encapsulated,
    Final,
}

fn boundary_marker(kind: BoundaryKind, boundary: &str) -> String {
    match kind {
        BoundaryKind::Initial => format!("--{boundary}{CRLF}"),
        BoundaryKind::Encapsulated => format!("{CRLF}--{boundary}{CRLF}"),
        BoundaryKind::Final => format!("{CRLF}--{boundary}--"),
    }
}

/// Encodes `form` into its `multipart/form-data` byte representation.
///
/// Parts are encoded in order. Streamed content is opened, drained and
/// closed one part at a time.
pub(crate) async fn encode(form: &MultipartFormData) -> Result<Bytes, MultipartError> {
    let mut encoded = BytesMut::new();
    let last = form.body_parts.len().saturating_sub(1);

    for (index, part) in form.body_parts.iter().enumerate() {
        let kind = if index == 0 {
            BoundaryKind::Initial
        } else {
            BoundaryKind::Encapsulated
        };
        encoded.put_slice(boundary_marker(kind, &form.boundary).as_bytes());
        encoded.put_slice(encode_headers(part)?.as_bytes());

        let content = read_content(part).await?;
        ensure!(
            !contains(&content, format!("--{}", form.boundary).as_bytes()),
            BoundaryInContentSnafu { name: &part.name }
        );
        encoded.put_slice(&content);

        if index == last {
            encoded.put_slice(boundary_marker(BoundaryKind::Final, &form.boundary).as_bytes());
        }
    }

    Ok(encoded.freeze())
}

fn encode_headers(part: &BodyPart) -> Result<String, MultipartError> {
    let mut text = String::new();
    for (name, value) in &part.headers {
        HeaderValue::from_str(value).context(InvalidPartHeaderSnafu {
            name: &part.name,
            header: name.clone(),
        })?;
        text.push_str(&canonical_name(name));
        text.push_str(": ");
        text.push_str(value);
        text.push_str(CRLF);
    }
    text.push_str(CRLF);
    Ok(text)
}

async fn read_content(part: &BodyPart) -> Result<Bytes, MultipartError> {
    let source = match &part.content {
        Content::Bytes(bytes) => return Ok(bytes.clone()),
        Content::Stream(source) => source,
    };

    let reader = source
        .open()
        .await
        .context(StreamOpenSnafu { name: &part.name })?;

    let capacity = usize::try_from(part.length).unwrap_or(usize::MAX).min(1 << 20);
    let mut content = BytesMut::with_capacity(capacity);
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    // One byte past the declared length is enough to tell the source is too long.
    let mut reader = reader.take(part.length.saturating_add(1));

    loop {
        let read = reader
            .read(&mut buffer)
            .await
            .context(StreamReadSnafu { name: &part.name })?;
        if read == 0 {
            break;
        }
        content.put_slice(&buffer[..read]);
    }

    let actual = content.len() as u64;
    ensure!(
        actual <= part.length,
        LengthExceededSnafu {
            name: &part.name,
            expected: part.length,
        }
    );
    ensure!(
        actual == part.length,
        LengthMismatchSnafu {
            name: &part.name,
            expected: part.length,
            actual,
        }
    );

    trace!(part = %part.name, bytes = actual, "read multipart content");
    Ok(content.freeze())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
