//! Interleaved binary frames (RFC 2326 §10.12).
//!
//! With the `RTP/AVP/TCP;interleaved=` transport, RTP and RTCP packets ride
//! on the RTSP TCP connection itself, each prefixed by a 4-byte header:
//!
//! ```text
//! +------+---------+----------------+------------------+
//! | 0x24 | channel | length (u16 BE)| payload (length) |
//! +------+---------+----------------+------------------+
//! ```
//!
//! A first byte of [`TERMINATION_MARKER`] (0x54, ASCII `T`) in place of `$`
//! is read as a clean end of the frame stream. This is a local convention,
//! not part of RTSP: it lets one side wake a reader that is blocked on a
//! frame header without closing the socket, and it also covers a peer that
//! switches back to sending a `TEARDOWN` request mid-stream. Do not rely on
//! other RTSP implementations honouring it.

use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, RtspError};

/// Interleaved frame marker (`$`).
pub const MAGIC: u8 = 0x24;

/// First byte that ends a frame stream cleanly.
pub const TERMINATION_MARKER: u8 = 0x54;

pub const HEADER_LEN: usize = 4;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Encode the 4-byte frame header for `payload_len` bytes on `channel`.
pub fn encode_header(channel: u8, payload_len: usize) -> Result<[u8; HEADER_LEN]> {
    let len = u16::try_from(payload_len).map_err(|_| RtspError::FrameTooLarge {
        length: payload_len,
        capacity: MAX_PAYLOAD_LEN,
    })?;
    let [hi, lo] = len.to_be_bytes();
    Ok([MAGIC, channel, hi, lo])
}

/// Append a complete frame to `dst`.
pub fn encode_frame(channel: u8, payload: &[u8], dst: &mut Vec<u8>) -> Result<()> {
    let header = encode_header(channel, payload.len())?;
    dst.extend_from_slice(&header);
    dst.extend_from_slice(payload);
    Ok(())
}

/// Read one frame into `buf`, returning `(channel, payload length)`.
///
/// The payload lands in `buf[..length]`; nothing is allocated. A declared
/// length larger than `buf` fails with [`RtspError::FrameTooLarge`] after
/// consuming only the 4 header bytes, leaving the payload unread in the
/// stream. End of stream before the first header byte, or the termination
/// marker, yields [`RtspError::Closed`]; end of stream anywhere later is an
/// `UnexpectedEof` I/O error.
pub fn read_frame<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(u8, usize)> {
    let mut header = [0u8; HEADER_LEN];
    read_exact_or_closed(reader, &mut header)?;

    match header[0] {
        MAGIC => {}
        TERMINATION_MARKER => return Err(RtspError::Closed),
        other => return Err(RtspError::BadFrameMagic(other)),
    }

    let channel = header[1];
    let length = u16::from_be_bytes([header[2], header[3]]) as usize;
    if length > buf.len() {
        return Err(RtspError::FrameTooLarge {
            length,
            capacity: buf.len(),
        });
    }

    reader.read_exact(&mut buf[..length])?;
    Ok((channel, length))
}

/// Write the termination marker so a peer blocked in [`read_frame`]
/// returns [`RtspError::Closed`].
pub fn write_termination<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(&[TERMINATION_MARKER, 0, 0, 0])?;
    writer.flush()?;
    Ok(())
}

fn read_exact_or_closed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Err(RtspError::Closed),
            Ok(0) => return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into()),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Fixed-capacity scratch buffer used to assemble outgoing frames.
///
/// Header and payload are copied into one contiguous slice so each frame
/// goes out in a single `write_all`. The capacity is fixed at construction
/// and bounds the largest frame that can be sent: `HEADER_LEN + payload`
/// must fit. The buffer is owned by one writer; it is not synchronized.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl FrameBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest payload this buffer can frame.
    pub fn max_payload_len(&self) -> usize {
        self.capacity.saturating_sub(HEADER_LEN).min(MAX_PAYLOAD_LEN)
    }

    /// Assemble header and payload, returning the bytes to write.
    ///
    /// Fails with [`RtspError::FrameTooLarge`] instead of truncating when
    /// the payload does not fit.
    pub fn assemble(&mut self, channel: u8, payload: &[u8]) -> Result<&[u8]> {
        if payload.len() > self.max_payload_len() {
            return Err(RtspError::FrameTooLarge {
                length: payload.len(),
                capacity: self.max_payload_len(),
            });
        }
        self.buf.clear();
        encode_frame(channel, payload, &mut self.buf)?;
        Ok(&self.buf)
    }
}
