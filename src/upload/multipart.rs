//! `multipart/form-data` framing with a length known before sending.
//!
//! The body is laid out as the form fields, then the file part header, the
//! file bytes, and the closing boundary. Everything except the file is built
//! up front, so the exact length is `head + file + tail` and the file itself
//! is streamed from disk.

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tokio_util::io::ReaderStream;

use super::descriptor::PairMap;

/// Pre-rendered multipart framing around a single file part.
#[derive(Debug, Clone)]
pub struct MultipartFraming {
    boundary: String,
    head: Vec<u8>,
    tail: Vec<u8>,
}

impl MultipartFraming {
    /// Framing with a random boundary.
    pub fn new(fields: &PairMap, file_field: &str, file_name: &str, file_type: &str) -> Self {
        let boundary = format!(
            "--------------------------{}",
            uuid::Uuid::new_v4().simple()
        );
        Self::with_boundary(boundary, fields, file_field, file_name, file_type)
    }

    pub fn with_boundary(
        boundary: String,
        fields: &PairMap,
        file_field: &str,
        file_name: &str,
        file_type: &str,
    ) -> Self {
        let mut head = String::new();
        for (name, value) in fields {
            head.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{value}\r\n",
                escape_quoted(name)
            ));
        }
        head.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {file_type}\r\n\r\n",
            escape_quoted(file_field),
            escape_quoted(file_name)
        ));
        let tail = format!("\r\n--{boundary}--\r\n");

        Self {
            boundary,
            head: head.into_bytes(),
            tail: tail.into_bytes(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact body length for a file of `file_len` bytes.
    pub fn content_length(&self, file_len: u64) -> u64 {
        self.head.len() as u64 + file_len + self.tail.len() as u64
    }

    /// Stream head, file contents and tail as one request body.
    pub fn into_body(self, file: tokio::fs::File) -> reqwest::Body {
        let Self { head, tail, .. } = self;
        let head = stream::once(async move { Ok::<Bytes, std::io::Error>(Bytes::from(head)) });
        let tail = stream::once(async move { Ok::<Bytes, std::io::Error>(Bytes::from(tail)) });
        let file = ReaderStream::with_capacity(file, super::STREAM_CHUNK_SIZE);
        reqwest::Body::wrap_stream(head.chain(file).chain(tail))
    }

    #[cfg(test)]
    fn render(&self, file: &[u8]) -> Vec<u8> {
        [self.head.as_slice(), file, self.tail.as_slice()].concat()
    }
}

/// Escape a name for a quoted `Content-Disposition` parameter.
fn escape_quoted(name: &str) -> String {
    name.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
