//! The connection façade: one socket, typed RTSP messages and interleaved
//! frames on top of it.
//!
//! A [`Connection`] is built around an already-connected stream. It never
//! opens, reconnects or closes sockets, never retries and never decides an
//! error is fatal.
//!
//! ## Reader and writer halves
//!
//! RTSP clients and servers usually read on one thread (responses and
//! incoming media frames) while another thread writes (requests, keepalives,
//! outgoing frames). [`Connection::split`] hands out a [`ConnectionReader`]
//! and a [`ConnectionWriter`] for that. Every write takes `&mut self`, so two
//! writers can only exist behind an external lock; the frame buffer and the
//! CSeq counter are never shared.
//!
//! ## Header injection
//!
//! Once enabled, [`ConnectionWriter::write_request`] **overwrites** the
//! `Session`, `CSeq` and `Authorization` headers on every outgoing request.
//! Values the caller put there are replaced, not merged; all other headers
//! pass through untouched.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use crate::error::{Result, RtspError};
use crate::interleaved::{self, FrameBuffer, MAGIC};
use crate::protocol::auth::AuthProvider;
use crate::protocol::codec::{self, ReadLimits};
use crate::protocol::message::Message;
use crate::protocol::request::Request;
use crate::protocol::response::Response;

/// Default capacity of the outgoing frame buffer, header included.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 2048;

/// Connection-level configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Capacity of the reusable buffer outgoing frames are assembled in.
    /// A frame's payload plus its 4-byte header must fit.
    pub write_buffer_size: usize,
    /// Longest start line or header line accepted from the peer.
    pub max_line_length: usize,
    /// Largest message body accepted from the peer.
    pub max_content_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            max_line_length: codec::DEFAULT_MAX_LINE_LENGTH,
            max_content_length: codec::DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl ConnectionConfig {
    fn read_limits(&self) -> ReadLimits {
        ReadLimits {
            max_line_length: self.max_line_length,
            max_content_length: self.max_content_length,
        }
    }
}

/// Either a parsed message or an interleaved frame, whichever arrived first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming<M> {
    Message(M),
    /// A frame whose payload now sits in `buf[..length]`.
    Frame { channel: u8, length: usize },
}

/// One RTSP connection: a buffered reader half and a stateful writer half
/// over the same socket.
pub struct Connection<R, W> {
    reader: ConnectionReader<R>,
    writer: ConnectionWriter<W>,
}

impl Connection<TcpStream, TcpStream> {
    /// Wrap a connected TCP stream with default configuration.
    pub fn new(stream: TcpStream) -> Result<Self> {
        Self::with_config(stream, ConnectionConfig::default())
    }

    /// Wrap a connected TCP stream. The read half is a `try_clone` of the
    /// same socket.
    pub fn with_config(stream: TcpStream, config: ConnectionConfig) -> Result<Self> {
        let reader = stream.try_clone()?;
        Ok(Self::from_parts(reader, stream, config))
    }
}

impl<R: Read, W: Write> Connection<R, W> {
    /// Build a connection from separate read and write handles of one stream.
    pub fn from_parts(reader: R, writer: W, config: ConnectionConfig) -> Self {
        Connection {
            reader: ConnectionReader::new(reader, config.read_limits()),
            writer: ConnectionWriter::new(writer, config.write_buffer_size),
        }
    }

    /// Separate the halves so reading and writing can run on different threads.
    pub fn split(self) -> (ConnectionReader<R>, ConnectionWriter<W>) {
        (self.reader, self.writer)
    }

    pub fn reader(&mut self) -> &mut ConnectionReader<R> {
        &mut self.reader
    }

    pub fn writer(&mut self) -> &mut ConnectionWriter<W> {
        &mut self.writer
    }

    /// See [`ConnectionWriter::enable_sequencing`].
    pub fn enable_sequencing(&mut self) {
        self.writer.enable_sequencing();
    }

    /// See [`ConnectionWriter::set_session`].
    pub fn set_session(&mut self, session: impl Into<String>) {
        self.writer.set_session(session);
    }

    /// See [`ConnectionWriter::set_credentials`].
    pub fn set_credentials(
        &mut self,
        user: &str,
        password: &str,
        realm: Option<&str>,
        nonce: Option<&str>,
    ) {
        self.writer.set_credentials(user, password, realm, nonce);
    }

    pub fn set_auth_provider(&mut self, provider: AuthProvider) {
        self.writer.set_auth_provider(provider);
    }

    pub fn read_request(&mut self) -> Result<Request> {
        self.reader.read_request()
    }

    pub fn read_response(&mut self) -> Result<Response> {
        self.reader.read_response()
    }

    pub fn read_interleaved_frame(&mut self, buf: &mut [u8]) -> Result<(u8, usize)> {
        self.reader.read_interleaved_frame(buf)
    }

    pub fn read_response_or_frame(&mut self, buf: &mut [u8]) -> Result<Incoming<Response>> {
        self.reader.read_response_or_frame(buf)
    }

    pub fn read_request_or_frame(&mut self, buf: &mut [u8]) -> Result<Incoming<Request>> {
        self.reader.read_request_or_frame(buf)
    }

    pub fn write_request(&mut self, request: &mut Request) -> Result<()> {
        self.writer.write_request(request)
    }

    pub fn write_response(&mut self, response: &Response) -> Result<()> {
        self.writer.write_response(response)
    }

    pub fn write_interleaved_frame(&mut self, channel: u8, payload: &[u8]) -> Result<()> {
        self.writer.write_interleaved_frame(channel, payload)
    }

    pub fn write_termination(&mut self) -> Result<()> {
        self.writer.write_termination()
    }

    /// Return the underlying read and write handles.
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }
}

/// Read half: parses messages and frames from a buffered stream.
///
/// Messages and frames share one read buffer, so they can be read in any
/// order on the same stream.
pub struct ConnectionReader<R> {
    inner: BufReader<R>,
    limits: ReadLimits,
}

impl<R: Read> ConnectionReader<R> {
    pub fn new(inner: R, limits: ReadLimits) -> Self {
        Self {
            inner: BufReader::new(inner),
            limits,
        }
    }

    /// Read one request. Inbound `CSeq`/`Session` values are not tracked.
    pub fn read_request(&mut self) -> Result<Request> {
        let request = codec::read_request(&mut self.inner, &self.limits)?;
        tracing::trace!(method = %request.method, uri = %request.uri, cseq = ?request.cseq(), "request read");
        Ok(request)
    }

    pub fn read_response(&mut self) -> Result<Response> {
        let response = codec::read_response(&mut self.inner, &self.limits)?;
        tracing::trace!(status = response.status_code, cseq = ?response.cseq(), "response read");
        Ok(response)
    }

    /// Read one interleaved frame into `buf`, returning `(channel, length)`.
    pub fn read_interleaved_frame(&mut self, buf: &mut [u8]) -> Result<(u8, usize)> {
        interleaved::read_frame(&mut self.inner, buf)
    }

    /// Read whichever comes next: a frame (first byte `$`) or a response.
    pub fn read_response_or_frame(&mut self, buf: &mut [u8]) -> Result<Incoming<Response>> {
        self.read_message_or_frame(buf)
    }

    /// Read whichever comes next: a frame (first byte `$`) or a request.
    pub fn read_request_or_frame(&mut self, buf: &mut [u8]) -> Result<Incoming<Request>> {
        self.read_message_or_frame(buf)
    }

    fn read_message_or_frame<M: Message>(&mut self, buf: &mut [u8]) -> Result<Incoming<M>> {
        let first = loop {
            match self.inner.fill_buf() {
                Ok(available) => break available.first().copied(),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };

        match first {
            None => Err(RtspError::Closed),
            Some(MAGIC) => {
                let (channel, length) = interleaved::read_frame(&mut self.inner, buf)?;
                Ok(Incoming::Frame { channel, length })
            }
            Some(_) => Ok(Incoming::Message(codec::read_message(
                &mut self.inner,
                &self.limits,
            )?)),
        }
    }

    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Mutable access to the stream. Reading from it directly bypasses
    /// the internal buffer.
    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    /// Return the stream. Bytes already buffered are discarded.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

/// Raw reads through the shared buffer, e.g. to drain the payload of a
/// frame rejected with [`RtspError::FrameTooLarge`].
impl<R: Read> Read for ConnectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Write half: serializes messages and frames and decorates outgoing
/// requests with the connection's session, sequence and credentials.
pub struct ConnectionWriter<W> {
    inner: W,
    frame_buf: FrameBuffer,
    session: Option<String>,
    /// `None` while sequencing is off; otherwise the last CSeq sent.
    cseq: Option<u32>,
    auth: Option<AuthProvider>,
}

impl<W: Write> ConnectionWriter<W> {
    pub fn new(inner: W, write_buffer_size: usize) -> Self {
        Self {
            inner,
            frame_buf: FrameBuffer::with_capacity(write_buffer_size),
            session: None,
            cseq: None,
            auth: None,
        }
    }

    /// Stamp every following request with `CSeq` 1, 2, 3, ...
    ///
    /// Calling it again does not restart the count. After `u32::MAX` the
    /// count starts over at 1.
    pub fn enable_sequencing(&mut self) {
        self.cseq.get_or_insert(0);
    }

    pub fn sequencing_enabled(&self) -> bool {
        self.cseq.is_some()
    }

    /// Stamp every following request with `Session: <session>`. An empty
    /// id clears the session.
    pub fn set_session(&mut self, session: impl Into<String>) {
        let session = session.into();
        self.session = (!session.is_empty()).then_some(session);
    }

    pub fn clear_session(&mut self) {
        self.session = None;
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Install credentials. Digest is used when both `realm` and `nonce`
    /// are given, Basic otherwise.
    pub fn set_credentials(
        &mut self,
        user: &str,
        password: &str,
        realm: Option<&str>,
        nonce: Option<&str>,
    ) {
        self.auth = Some(AuthProvider::new(user, password, realm, nonce));
    }

    pub fn set_auth_provider(&mut self, provider: AuthProvider) {
        self.auth = Some(provider);
    }

    pub fn clear_credentials(&mut self) {
        self.auth = None;
    }

    /// Decorate and send a request.
    ///
    /// `Session`, `CSeq` and `Authorization` are overwritten on `request`
    /// when the matching mode is on, so after the call `request` holds
    /// exactly what went on the wire. A caller-supplied `Content-Length`
    /// is sent as is.
    pub fn write_request(&mut self, request: &mut Request) -> Result<()> {
        if let Some(session) = &self.session {
            request.headers.insert("Session", session.clone());
        }
        if let Some(cseq) = self.cseq.as_mut() {
            *cseq = cseq.checked_add(1).unwrap_or(1);
            request.headers.insert("CSeq", cseq.to_string());
        }
        if let Some(auth) = &self.auth {
            let authorization = auth.authorization_header(&request.method, &request.uri);
            request.headers.insert("Authorization", authorization);
        }

        tracing::trace!(method = %request.method, uri = %request.uri, cseq = ?self.cseq, "writing request");
        codec::write_message(&mut self.inner, request)
    }

    /// Send a response unchanged.
    pub fn write_response(&mut self, response: &Response) -> Result<()> {
        tracing::trace!(status = response.status_code, cseq = ?response.cseq(), "writing response");
        codec::write_message(&mut self.inner, response)
    }

    /// Send one interleaved frame with a single write.
    ///
    /// Fails with [`RtspError::FrameTooLarge`] when the payload does not
    /// fit the write buffer; larger payloads must be fragmented by the caller.
    pub fn write_interleaved_frame(&mut self, channel: u8, payload: &[u8]) -> Result<()> {
        let frame = self.frame_buf.assemble(channel, payload)?;
        self.inner.write_all(frame)?;
        self.inner.flush()?;
        Ok(())
    }

    /// Send the termination marker that makes the peer's
    /// [`ConnectionReader::read_interleaved_frame`] return
    /// [`RtspError::Closed`].
    pub fn write_termination(&mut self) -> Result<()> {
        tracing::debug!("writing interleaved termination marker");
        interleaved::write_termination(&mut self.inner)
    }

    /// Largest payload [`write_interleaved_frame`](Self::write_interleaved_frame) accepts.
    pub fn max_frame_payload(&self) -> usize {
        self.frame_buf.max_payload_len()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
