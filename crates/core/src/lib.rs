//! Transport layer of an RTSP toolkit.
//!
//! Turns one connected byte stream into a typed channel for RTSP
//! request/response messages and for RTP/RTCP frames interleaved on the
//! same stream. Session state machines, SDP and depacketization live in
//! the layers above and drive this one through [`Connection`].

pub mod connection;
pub mod error;
pub mod interleaved;
pub mod protocol;

pub use connection::{Connection, ConnectionConfig, ConnectionReader, ConnectionWriter, Incoming};
pub use error::{Result, RtspError};
pub use protocol::{AuthProvider, Headers, Message, Method, Request, Response};
