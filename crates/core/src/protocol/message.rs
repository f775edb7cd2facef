use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RtspError};
use crate::protocol::headers::Headers;

/// RTSP protocol version written on outgoing messages.
pub const RTSP_VERSION: &str = "RTSP/1.0";

/// RTSP method token (RFC 2326 §10).
///
/// Methods outside the standard set are kept verbatim in [`Method::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Options,
    Describe,
    Announce,
    Setup,
    Play,
    Pause,
    Record,
    Redirect,
    Teardown,
    GetParameter,
    SetParameter,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Options => "OPTIONS",
            Method::Describe => "DESCRIBE",
            Method::Announce => "ANNOUNCE",
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Pause => "PAUSE",
            Method::Record => "RECORD",
            Method::Redirect => "REDIRECT",
            Method::Teardown => "TEARDOWN",
            Method::GetParameter => "GET_PARAMETER",
            Method::SetParameter => "SET_PARAMETER",
            Method::Other(token) => token.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "OPTIONS" => Method::Options,
            "DESCRIBE" => Method::Describe,
            "ANNOUNCE" => Method::Announce,
            "SETUP" => Method::Setup,
            "PLAY" => Method::Play,
            "PAUSE" => Method::Pause,
            "RECORD" => Method::Record,
            "REDIRECT" => Method::Redirect,
            "TEARDOWN" => Method::Teardown,
            "GET_PARAMETER" => Method::GetParameter,
            "SET_PARAMETER" => Method::SetParameter,
            other => Method::Other(other.to_string()),
        })
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

/// Shape shared by [`Request`](super::Request) and
/// [`Response`](super::Response): a start line, a header table and a body.
///
/// The codec is generic over this trait.
pub trait Message: Sized {
    /// Build the message skeleton from its start line. Fails with
    /// [`RtspError::MalformedStartLine`] when the line has the wrong shape.
    fn parse_start_line(line: &str) -> Result<Self>;

    /// Append the start line, including its CRLF.
    fn write_start_line(&self, dst: &mut Vec<u8>);

    fn headers(&self) -> &Headers;

    fn headers_mut(&mut self) -> &mut Headers;

    fn body(&self) -> &[u8];

    fn set_body(&mut self, body: Vec<u8>);
}

/// Checks the `RTSP/x.y` version token of a start line.
pub(crate) fn parse_version(token: &str, line: &str) -> Result<String> {
    let valid = token
        .strip_prefix("RTSP/")
        .and_then(|rest| rest.split_once('.'))
        .is_some_and(|(major, minor)| {
            !major.is_empty()
                && !minor.is_empty()
                && major.bytes().all(|b| b.is_ascii_digit())
                && minor.bytes().all(|b| b.is_ascii_digit())
        });

    if valid {
        Ok(token.to_string())
    } else {
        Err(malformed_start_line(line))
    }
}

pub(crate) fn malformed_start_line(line: &str) -> RtspError {
    RtspError::MalformedStartLine {
        line: line.to_string(),
    }
}
