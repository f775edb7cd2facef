//! Error types for the RTSP connection layer.

/// Errors returned by the message codec, the interleaved frame codec and
/// the [`Connection`](crate::Connection) façade.
///
/// Variants map to the layer that produced them:
///
/// - **Message codec**: [`MalformedStartLine`](Self::MalformedStartLine),
///   [`MalformedHeader`](Self::MalformedHeader), [`LineTooLong`](Self::LineTooLong),
///   [`InvalidContentLength`](Self::InvalidContentLength),
///   [`ContentLengthTooLarge`](Self::ContentLengthTooLarge),
///   [`TruncatedBody`](Self::TruncatedBody).
/// - **Frame codec**: [`BadFrameMagic`](Self::BadFrameMagic),
///   [`FrameTooLarge`](Self::FrameTooLarge).
/// - **Auth**: [`AuthChallenge`](Self::AuthChallenge).
/// - **Transport**: [`Io`](Self::Io) and [`Closed`](Self::Closed).
///
/// Nothing in this crate retries, logs or closes the socket on error. Whether
/// an error is fatal to the connection is the caller's decision.
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying socket failure, including a stream that ended in the
    /// middle of a header block or frame (`ErrorKind::UnexpectedEof`).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly on a message or frame boundary, or the peer
    /// sent the interleaved termination marker.
    #[error("connection closed")]
    Closed,

    /// The first line is not `METHOD URI VERSION` (request) or
    /// `VERSION STATUS REASON` (response), or is longer than allowed.
    #[error("malformed start line: {line:?}")]
    MalformedStartLine { line: String },

    /// A header line without a `:` separator.
    #[error("malformed header line: {line:?}")]
    MalformedHeader { line: String },

    /// A header line exceeded the configured maximum length.
    #[error("header line exceeds {max} bytes")]
    LineTooLong { max: usize },

    /// `Content-Length` is present but not a non-negative integer.
    #[error("invalid Content-Length: {value:?}")]
    InvalidContentLength { value: String },

    /// `Content-Length` is larger than the reader is configured to accept.
    #[error("Content-Length {length} exceeds limit of {max} bytes")]
    ContentLengthTooLarge { length: usize, max: usize },

    /// The stream ended before `Content-Length` bytes of body arrived.
    #[error("truncated body: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: usize, received: usize },

    /// The first byte of an interleaved frame header is neither `$` nor the
    /// termination marker.
    #[error("bad interleaved frame magic: {0:#04x}")]
    BadFrameMagic(u8),

    /// A frame does not fit the buffer it must be read into or assembled in,
    /// or its payload exceeds the 16-bit length field.
    #[error("interleaved frame of {length} bytes exceeds capacity of {capacity}")]
    FrameTooLarge { length: usize, capacity: usize },

    /// A `WWW-Authenticate` challenge that cannot be answered.
    #[error("unsupported authentication challenge: {0}")]
    AuthChallenge(String),
}

impl RtspError {
    /// True for the graceful-close signal: end of stream on a boundary or the
    /// interleaved termination marker.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;
