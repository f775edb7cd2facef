//! Blocking RTSP message codec.
//!
//! Reads one complete request or response from a [`BufRead`] and writes
//! one to a [`Write`]. There is no partial delivery: a read returns only
//! once the start line, the header block and `Content-Length` bytes of body
//! are all in hand, or fails.
//!
//! The body length comes exclusively from `Content-Length`; RTSP has no
//! chunked or close-delimited bodies. On the write side the codec does not
//! compute `Content-Length` either. Callers that set a body keep the header
//! consistent themselves.

use std::io::{BufRead, ErrorKind, Read, Write};

use crate::error::{Result, RtspError};
use crate::protocol::message::Message;
use crate::protocol::request::Request;
use crate::protocol::response::Response;

/// Default longest accepted start line or header line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Default largest accepted body, in bytes.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 128 * 1024;

/// Bounds on what a peer can make the reader buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub max_line_length: usize,
    pub max_content_length: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// Read one RTSP request.
pub fn read_request<R: BufRead>(reader: &mut R, limits: &ReadLimits) -> Result<Request> {
    read_message(reader, limits)
}

/// Read one RTSP response.
pub fn read_response<R: BufRead>(reader: &mut R, limits: &ReadLimits) -> Result<Response> {
    read_message(reader, limits)
}

/// Read one message of type `M`.
///
/// Returns [`RtspError::Closed`] when the stream ends before the first byte
/// of a start line. Empty lines ahead of the start line are skipped.
pub fn read_message<M: Message, R: BufRead>(reader: &mut R, limits: &ReadLimits) -> Result<M> {
    let start_line = loop {
        let line = read_line(reader, limits.max_line_length)
            .map_err(|err| match err {
                RtspError::LineTooLong { max } => RtspError::MalformedStartLine {
                    line: format!("<start line exceeds {} bytes>", max),
                },
                other => other,
            })?
            .ok_or(RtspError::Closed)?;
        if !line.is_empty() {
            break line;
        }
    };
    let start_line = String::from_utf8(start_line).map_err(|err| RtspError::MalformedStartLine {
        line: String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })?;

    let mut message = M::parse_start_line(&start_line)?;

    loop {
        let line = read_line(reader, limits.max_line_length)?
            .ok_or_else(|| std::io::Error::from(ErrorKind::UnexpectedEof))?;
        if line.is_empty() {
            break;
        }
        let line = String::from_utf8(line).map_err(|err| RtspError::MalformedHeader {
            line: String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })?;
        let (name, value) = parse_header_line(&line)?;
        message.headers_mut().append(name, value);
    }

    let content_length = content_length(&message, limits)?;
    if content_length > 0 {
        let mut body = Vec::with_capacity(content_length);
        reader
            .by_ref()
            .take(content_length as u64)
            .read_to_end(&mut body)?;
        if body.len() < content_length {
            return Err(RtspError::TruncatedBody {
                expected: content_length,
                received: body.len(),
            });
        }
        message.set_body(body);
    }

    Ok(message)
}

/// Serialize a message: start line, headers in table order, empty line,
/// body verbatim.
pub fn encode_message<M: Message>(message: &M) -> Vec<u8> {
    let mut dst = Vec::with_capacity(256 + message.body().len());
    message.write_start_line(&mut dst);
    message.headers().serialize_into(&mut dst);
    dst.extend_from_slice(b"\r\n");
    dst.extend_from_slice(message.body());
    dst
}

/// Write a message with a single `write_all`, then flush.
pub fn write_message<M: Message, W: Write>(writer: &mut W, message: &M) -> Result<()> {
    writer.write_all(&encode_message(message))?;
    writer.flush()?;
    Ok(())
}

fn parse_header_line(line: &str) -> Result<(&str, &str)> {
    let malformed = || RtspError::MalformedHeader {
        line: line.to_string(),
    };
    let (name, value) = line.split_once(':').ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed());
    }
    Ok((name, value.trim()))
}

fn content_length<M: Message>(message: &M, limits: &ReadLimits) -> Result<usize> {
    let Some(value) = message.headers().get_first("Content-Length") else {
        return Ok(0);
    };
    let length = value
        .trim()
        .parse::<usize>()
        .map_err(|_| RtspError::InvalidContentLength {
            value: value.to_string(),
        })?;
    if length > limits.max_content_length {
        return Err(RtspError::ContentLengthTooLarge {
            length,
            max: limits.max_content_length,
        });
    }
    Ok(length)
}

/// Read up to and including the next `\n`, returning the line without its
/// `\r\n` (or bare `\n`) terminator.
///
/// `Ok(None)` means the stream ended before any byte of the line; ending
/// after a partial line is `UnexpectedEof`.
fn read_line<R: BufRead>(reader: &mut R, max: usize) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    loop {
        let (found, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if available.is_empty() {
                if line.is_empty() {
                    return Ok(None);
                }
                return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    line.extend_from_slice(&available[..idx]);
                    (true, idx + 1)
                }
                None => {
                    line.extend_from_slice(available);
                    (false, available.len())
                }
            }
        };
        reader.consume(used);

        if line.len() > max + 1 {
            return Err(RtspError::LineTooLong { max });
        }
        if found {
            break;
        }
    }

    if line.last() == Some(&b'\r') {
        line.pop();
    }
    if line.len() > max {
        return Err(RtspError::LineTooLong { max });
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor};

    use super::*;
    use crate::protocol::message::Method;

    fn parse_request(raw: &[u8]) -> Result<Request> {
        read_request(&mut Cursor::new(raw.to_vec()), &ReadLimits::default())
    }

    fn parse_response(raw: &[u8]) -> Result<Response> {
        read_response(&mut Cursor::new(raw.to_vec()), &ReadLimits::default())
    }

    #[test]
    fn parse_options_request() {
        let req = parse_request(
            b"OPTIONS rtsp://example.com/media.mp4 RTSP/1.0\r\n\
              CSeq: 1\r\n\
              Require: implicit-play\r\n\
              Proxy-Require: gzipped-messages\r\n\r\n",
        )
        .unwrap();
        assert_eq!(req.method, Method::Options);
        assert_eq!(req.uri, "rtsp://example.com/media.mp4");
        assert_eq!(req.cseq(), Some(1));
        assert_eq!(req.header("require"), Some("implicit-play"));
        assert_eq!(req.header("Proxy-Require"), Some("gzipped-messages"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn parse_describe_response_with_body() {
        let res = parse_response(
            b"RTSP/1.0 200 OK\r\n\
              CSeq: 2\r\n\
              Content-Type: application/sdp\r\n\
              Content-Length: 22\r\n\r\n\
              v=0\r\nm=video 0 RTP/AVP 96",
        )
        .unwrap();
        assert_eq!(res.status_code, 200);
        assert_eq!(res.reason, "OK");
        assert_eq!(res.body, b"v=0\r\nm=video 0 RTP/AVP 96");
    }

    #[test]
    fn bare_lf_line_endings_accepted() {
        let req = parse_request(b"PLAY rtsp://x/s RTSP/1.0\nCSeq: 4\nSession: 1234abcd\n\n").unwrap();
        assert_eq!(req.method, Method::Play);
        assert_eq!(req.session(), Some("1234abcd"));
    }

    #[test]
    fn repeated_header_lines_accumulate() {
        let res = parse_response(
            b"RTSP/1.0 401 Unauthorized\r\n\
              CSeq: 1\r\n\
              WWW-Authenticate: Digest realm=\"cam\", nonce=\"n\"\r\n\
              WWW-Authenticate: Basic realm=\"cam\"\r\n\r\n",
        )
        .unwrap();
        assert_eq!(res.www_authenticate().len(), 2);
        assert_eq!(res.headers.len(), 2);
    }

    #[test]
    fn leading_empty_lines_skipped() {
        let req = parse_request(b"\r\n\r\nOPTIONS * RTSP/1.0\r\nCSeq: 9\r\n\r\n").unwrap();
        assert_eq!(req.uri, "*");
        assert_eq!(req.cseq(), Some(9));
    }

    #[test]
    fn consecutive_messages_on_one_stream() {
        let mut reader = Cursor::new(
            b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nContent-Length: 3\r\n\r\nabc\
              RTSP/1.0 200 OK\r\nCSeq: 2\r\n\r\n"
                .to_vec(),
        );
        let limits = ReadLimits::default();
        let first = read_response(&mut reader, &limits).unwrap();
        let second = read_response(&mut reader, &limits).unwrap();
        assert_eq!((first.cseq(), first.body.as_slice()), (Some(1), b"abc".as_slice()));
        assert_eq!(second.cseq(), Some(2));
        assert!(read_response(&mut reader, &limits).unwrap_err().is_closed());
    }

    #[test]
    fn missing_version_is_malformed_start_line() {
        let err = parse_request(b"DESCRIBE rtsp://x/s\r\nCSeq: 1\r\n\r\n").unwrap_err();
        assert!(matches!(err, RtspError::MalformedStartLine { .. }));
    }

    #[test]
    fn header_without_colon_is_malformed() {
        let err = parse_request(b"OPTIONS * RTSP/1.0\r\nCSeq 1\r\n\r\n").unwrap_err();
        match err {
            RtspError::MalformedHeader { line } => assert_eq!(line, "CSeq 1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_body_is_truncated() {
        let err = parse_request(
            b"ANNOUNCE rtsp://x/s RTSP/1.0\r\nCSeq: 1\r\nContent-Length: 10\r\n\r\nabc",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RtspError::TruncatedBody {
                expected: 10,
                received: 3
            }
        ));
    }

    #[test]
    fn invalid_content_length() {
        let err = parse_request(b"OPTIONS * RTSP/1.0\r\nContent-Length: -1\r\n\r\n").unwrap_err();
        assert!(matches!(err, RtspError::InvalidContentLength { .. }));
    }

    #[test]
    fn content_length_over_limit() {
        let limits = ReadLimits {
            max_content_length: 8,
            ..ReadLimits::default()
        };
        let raw = b"OPTIONS * RTSP/1.0\r\nContent-Length: 9\r\n\r\n123456789".to_vec();
        let err = read_request(&mut Cursor::new(raw), &limits).unwrap_err();
        assert!(matches!(err, RtspError::ContentLengthTooLarge { length: 9, max: 8 }));
    }

    #[test]
    fn overlong_lines_rejected() {
        let limits = ReadLimits {
            max_line_length: 32,
            ..ReadLimits::default()
        };
        let long_uri = format!("OPTIONS rtsp://example.com/{} RTSP/1.0\r\n\r\n", "a".repeat(64));
        let err = read_request(&mut Cursor::new(long_uri.into_bytes()), &limits).unwrap_err();
        assert!(matches!(err, RtspError::MalformedStartLine { .. }));

        let long_header = format!("OPTIONS * RTSP/1.0\r\nX-Pad: {}\r\n\r\n", "b".repeat(64));
        let err = read_request(&mut Cursor::new(long_header.into_bytes()), &limits).unwrap_err();
        assert!(matches!(err, RtspError::LineTooLong { max: 32 }));
    }

    #[test]
    fn eof_inside_header_block_is_io_error() {
        let err = parse_request(b"OPTIONS * RTSP/1.0\r\nCSeq: 1\r\n").unwrap_err();
        match err {
            RtspError::Io(io) => assert_eq!(io.kind(), ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_stream_is_closed() {
        assert!(parse_request(b"").unwrap_err().is_closed());
    }

    #[test]
    fn request_round_trip() {
        let req = Request::new(Method::Setup, "rtsp://example.com/stream/track1")
            .with_header("CSeq", "3")
            .with_header("Transport", "RTP/AVP/TCP;unicast;interleaved=0-1")
            .with_header("User-Agent", "probe")
            .with_body(vec![0u8, 159, 146, 150, b'\r', b'\n']);

        let wire = encode_message(&req);
        let parsed = read_request(
            &mut BufReader::with_capacity(7, Cursor::new(wire.clone())),
            &ReadLimits::default(),
        )
        .unwrap();
        assert_eq!(parsed, req);
        assert_eq!(encode_message(&parsed), wire);
    }

    #[test]
    fn emptied_header_round_trips() {
        let mut req = Request::new(Method::Options, "*").with_header("X-Empty", "v");
        req.headers.set("X-Empty", Vec::<String>::new());
        req.headers.insert("CSeq", "1");

        let parsed = parse_request(&encode_message(&req)).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn response_round_trip() {
        let res = Response::new(461, "Unsupported Transport")
            .with_header("CSeq", "5")
            .with_header("Server", "test");
        let mut wire = Vec::new();
        write_message(&mut wire, &res).unwrap();
        assert_eq!(
            wire,
            b"RTSP/1.0 461 Unsupported Transport\r\nCSeq: 5\r\nServer: test\r\n\r\n".to_vec()
        );
        assert_eq!(parse_response(&wire).unwrap(), res);
    }

    #[test]
    fn serialize_does_not_add_content_length() {
        let mut req = Request::new(Method::Announce, "rtsp://x/s");
        req.body = b"v=0".to_vec();
        let wire = String::from_utf8(encode_message(&req)).unwrap();
        assert_eq!(wire, "ANNOUNCE rtsp://x/s RTSP/1.0\r\n\r\nv=0");
    }
}
