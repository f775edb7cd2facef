//! RTSP message layer (RFC 2326).
//!
//! RTSP messages follow HTTP/1.1 syntax with a different method set:
//!
//! ```text
//! DESCRIBE rtsp://server/stream RTSP/1.0\r\n
//! CSeq: 2\r\n
//! Accept: application/sdp\r\n
//! \r\n
//! ```
//!
//! - [`headers`]: ordered, case-insensitive header table.
//! - [`request`] / [`response`]: the two message types, sharing the
//!   [`Message`] shape.
//! - [`codec`]: blocking read/write of complete messages.
//! - [`auth`]: Basic and Digest `Authorization` values.

pub mod auth;
pub mod codec;
pub mod headers;
pub mod message;
pub mod request;
pub mod response;

pub use auth::AuthProvider;
pub use headers::Headers;
pub use message::{Message, Method};
pub use request::Request;
pub use response::Response;
