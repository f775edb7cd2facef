use std::fmt;

use crate::error::Result;
use crate::protocol::headers::Headers;
use crate::protocol::message::{Message, RTSP_VERSION, malformed_start_line, parse_version};

/// An RTSP response (RFC 2326 §7).
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 1\r\n
/// Content-Type: application/sdp\r\n
/// Content-Length: 142\r\n
/// \r\n
/// v=0\r\n...
/// ```
///
/// Unlike a server-side builder, this type never adds `Content-Length` on
/// its own when serialized; [`with_body`](Self::with_body) is the only
/// place that sets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub version: String,
    pub status_code: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status_code: u16, reason: &str) -> Self {
        Response {
            version: RTSP_VERSION.to_string(),
            status_code,
            reason: reason.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// 200 OK — success (RFC 2326 §7.1.1).
    pub fn ok() -> Self {
        Self::new(200, "OK")
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

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_first(name)
    }

    pub fn cseq(&self) -> Option<u32> {
        self.header("CSeq").and_then(|v| v.trim().parse().ok())
    }

    /// Session id without its `;timeout=` parameter (RFC 2326 §12.37).
    pub fn session(&self) -> Option<&str> {
        self.header("Session")
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// The `WWW-Authenticate` challenges offered with a 401 response.
    pub fn www_authenticate(&self) -> &[String] {
        self.headers.get("WWW-Authenticate").unwrap_or_default()
    }
}

impl Message for Response {
    fn parse_start_line(line: &str) -> Result<Self> {
        let mut parts = line.splitn(3, ' ');
        let (Some(version), Some(status), Some(reason)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed_start_line(line));
        };

        if status.len() != 3 {
            return Err(malformed_start_line(line));
        }
        let status_code = status
            .parse::<u16>()
            .map_err(|_| malformed_start_line(line))?;

        Ok(Response {
            version: parse_version(version, line)?,
            status_code,
            reason: reason.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        })
    }

    fn write_start_line(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(
            format!("{} {} {}\r\n", self.version, self.status_code, self.reason).as_bytes(),
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

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {}", self.version, self.status_code, self.reason)?;
        write!(f, "{}", self.headers)?;
        if !self.body.is_empty() {
            writeln!(f, "[{} bytes]", self.body.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RtspError;

    #[test]
    fn parse_status_line_with_spaces_in_reason() {
        let res = Response::parse_start_line("RTSP/1.0 454 Session Not Found").unwrap();
        assert_eq!(res.status_code, 454);
        assert_eq!(res.reason, "Session Not Found");
        assert_eq!(res.version, "RTSP/1.0");
    }

    #[test]
    fn status_line_missing_reason() {
        let err = Response::parse_start_line("RTSP/1.0 200").unwrap_err();
        assert!(matches!(err, RtspError::MalformedStartLine { .. }));
    }

    #[test]
    fn status_code_must_be_three_digits() {
        assert!(Response::parse_start_line("RTSP/1.0 20 OK").is_err());
        assert!(Response::parse_start_line("RTSP/1.0 abc OK").is_err());
    }

    #[test]
    fn session_strips_timeout() {
        let res = Response::ok().with_header("Session", "12345678;timeout=60");
        assert_eq!(res.session(), Some("12345678"));
    }

    #[test]
    fn success_range() {
        assert!(Response::ok().is_success());
        assert!(!Response::new(401, "Unauthorized").is_success());
    }
}
