//! HTTP/1.1 codec for the relay's plain-text command surface
//!
//! Requests are framed as:
//! ```text
//! <METHOD> <path>[?query] HTTP/1.x\r\n
//! <Header>: <value>\r\n
//! ...
//! \r\n
//! [ Content-Length bytes of body ]
//! ```
//!
//! Only `Content-Length` framing is supported. Responses are always
//! `text/plain` with an explicit length.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::StatusCode;

/// Maximum size of the request line plus headers
pub const MAX_HEAD_SIZE: usize = 16 * 1024;

/// Maximum request body size
pub const MAX_BODY_SIZE: usize = 64 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Errors that can occur while decoding a request
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Request head too large (max: {MAX_HEAD_SIZE} bytes)")]
    HeadTooLarge,

    #[error("Request body too large: {0} bytes (max: {MAX_BODY_SIZE})")]
    BodyTooLarge(usize),

    #[error("Malformed request head: {0}")]
    InvalidHead(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("Transfer-Encoding is not supported")]
    UnsupportedTransferEncoding,
}

impl CodecError {
    /// Status to answer with before closing the connection
    pub fn status(&self) -> StatusCode {
        match self {
            CodecError::HeadTooLarge | CodecError::BodyTooLarge(_) => StatusCode::PayloadTooLarge,
            _ => StatusCode::BadRequest,
        }
    }
}

/// A fully received HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Path with any query string stripped
    pub path: String,
    /// Minor HTTP version (`0` or `1`)
    pub version: u8,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Request {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the connection should stay open after this request
    pub fn keep_alive(&self) -> bool {
        match self.header("connection") {
            Some(value) if value.eq_ignore_ascii_case("close") => false,
            Some(value) if value.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version >= 1,
        }
    }
}

/// Try to decode one request from a buffer
///
/// Returns:
/// - `Ok(Some(request))` if a complete request was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid
pub fn decode(buf: &mut BytesMut) -> Result<Option<Request>, CodecError> {
    let head_end = match find_head_end(buf) {
        Some(pos) => pos,
        None => {
            if buf.len() > MAX_HEAD_SIZE {
                return Err(CodecError::HeadTooLarge);
            }
            return Ok(None);
        }
    };

    if head_end > MAX_HEAD_SIZE {
        return Err(CodecError::HeadTooLarge);
    }

    let head = std::str::from_utf8(&buf[..head_end])
        .map_err(|_| CodecError::InvalidHead("head is not valid UTF-8".into()))?;
    let (method, path, version, headers) = parse_head(head)?;

    if headers
        .iter()
        .any(|(key, _)| key.eq_ignore_ascii_case("transfer-encoding"))
    {
        return Err(CodecError::UnsupportedTransferEncoding);
    }

    let content_length = content_length(&headers)?;
    if content_length > MAX_BODY_SIZE {
        return Err(CodecError::BodyTooLarge(content_length));
    }

    let total_len = head_end + HEAD_TERMINATOR.len() + content_length;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(head_end + HEAD_TERMINATOR.len());
    let body = buf.split_to(content_length).freeze();

    Ok(Some(Request {
        method,
        path,
        version,
        headers,
        body,
    }))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
}

type Head = (String, String, u8, Vec<(String, String)>);

fn parse_head(head: &str) -> Result<Head, CodecError> {
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();

    let mut parts = request_line.split(' ').filter(|p| !p.is_empty());
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) => (m, t, v),
        _ => {
            return Err(CodecError::InvalidHead(format!(
                "bad request line: {:?}",
                request_line
            )))
        }
    };

    let version = match version {
        "HTTP/1.1" => 1,
        "HTTP/1.0" => 0,
        other => {
            return Err(CodecError::InvalidHead(format!(
                "unsupported version: {}",
                other
            )))
        }
    };

    if !target.starts_with('/') {
        return Err(CodecError::InvalidHead(format!("bad target: {}", target)));
    }
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut headers = Vec::new();
    for line in lines {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| CodecError::InvalidHead(format!("bad header line: {:?}", line)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CodecError::InvalidHead("empty header name".into()));
        }
        headers.push((key.to_string(), value.trim().to_string()));
    }

    Ok((method.to_string(), path, version, headers))
}

fn content_length(headers: &[(String, String)]) -> Result<usize, CodecError> {
    let mut length: Option<usize> = None;

    for (_, value) in headers
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case("content-length"))
    {
        let parsed = value
            .parse::<usize>()
            .map_err(|_| CodecError::InvalidContentLength(value.clone()))?;
        match length {
            Some(existing) if existing != parsed => {
                return Err(CodecError::InvalidContentLength(value.clone()));
            }
            _ => length = Some(parsed),
        }
    }

    Ok(length.unwrap_or(0))
}

/// Streaming request decoder for one connection
#[derive(Debug, Default)]
pub struct RequestDecoder {
    /// Partial request data being accumulated
    buffer: BytesMut,
}

impl RequestDecoder {
    /// Create a new request decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next request from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain pipelined requests
    pub fn decode_next(&mut self) -> Result<Option<Request>, CodecError> {
        decode(&mut self.buffer)
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

/// A plain-text response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
    /// Ask the client to close the connection
    pub close: bool,
}

impl Response {
    /// Build a response whose body is `message` followed by a newline
    pub fn text(status: StatusCode, message: impl AsRef<str>) -> Self {
        Self {
            status,
            body: format!("{}\n", message.as_ref()),
            close: false,
        }
    }

    /// The `200 ok` acknowledgment
    pub fn ok() -> Self {
        Self::text(StatusCode::Ok, "ok")
    }

    /// Mark the response as the last one on its connection
    pub fn closing(mut self) -> Self {
        self.close = true;
        self
    }

    /// Encode the response into bytes ready to write
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(160 + self.body.len());

        buf.put_slice(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.code(),
                self.status.reason_phrase()
            )
            .as_bytes(),
        );
        buf.put_slice(b"Content-Type: text/plain; charset=utf-8\r\n");
        buf.put_slice(b"X-Content-Type-Options: nosniff\r\n");
        buf.put_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        if self.close {
            buf.put_slice(b"Connection: close\r\n");
        }
        buf.put_slice(b"\r\n");
        buf.put_slice(self.body.as_bytes());

        buf.freeze()
    }
}
