use std::fmt;

use crate::error::Result;
use crate::protocol::headers::Headers;
use crate::protocol::message::{
    Message, Method, RTSP_VERSION, malformed_start_line, parse_version,
};

/// An RTSP request (RFC 2326 §6).
///
/// ```text
/// Method SP Request-URI SP RTSP-Version CRLF
/// *(Header: Value CRLF)
/// CRLF
/// [body]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// RTSP method (OPTIONS, DESCRIBE, SETUP, PLAY, etc.).
    pub method: Method,
    /// Request-URI (e.g. `rtsp://host:port/stream/track1`, or `*`).
    pub uri: String,
    /// Protocol version token, `RTSP/1.0` unless parsed otherwise.
    pub version: String,
    pub headers: Headers,
    /// Raw body bytes; empty when the request carries none.
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: impl Into<Method>, uri: impl Into<String>) -> Self {
        Request {
            method: method.into(),
            uri: uri.into(),
            version: RTSP_VERSION.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Attach a body and set `Content-Length` to match it.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.headers
            .insert("Content-Length", self.body.len().to_string());
        self
    }

    /// Look up the first value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_first(name)
    }

    /// The CSeq header value, which numbers and orders request/response
    /// pairs (RFC 2326 §12.17).
    pub fn cseq(&self) -> Option<u32> {
        self.header("CSeq").and_then(|v| v.trim().parse().ok())
    }

    pub fn session(&self) -> Option<&str> {
        self.header("Session")
    }
}

impl Message for Request {
    fn parse_start_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split(' ').collect();
        let [method, uri, version] = parts[..] else {
            return Err(malformed_start_line(line));
        };
        if method.is_empty() || uri.is_empty() {
            return Err(malformed_start_line(line));
        }

        Ok(Request {
            method: Method::from(method),
            uri: uri.to_string(),
            version: parse_version(version, line)?,
            headers: Headers::new(),
            body: Vec::new(),
        })
    }

    fn write_start_line(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(
            format!("{} {} {}\r\n", self.method, self.uri, self.version).as_bytes(),
        );
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {}", self.method, self.uri, self.version)?;
        write!(f, "{}", self.headers)?;
        if !self.body.is_empty() {
            writeln!(f, "[{} bytes]", self.body.len())?;
        }
        Ok(())
    }
}
