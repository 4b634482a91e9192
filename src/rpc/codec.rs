//! Binary framing for the RPC transport.
//!
//! ```text
//! +-----------+-----------+-----------+-------------+----------------+
//! | magic u32 | ver u16   | kind u16  | length u32  | payload (JSON) |
//! +-----------+-----------+-----------+-------------+----------------+
//! ```
//! All integers are big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAGIC: u32 = 0x4543_4831; // "ECH1"
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 12;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("invalid magic number {0:#010x}")]
    InvalidMagic(u32),
    #[error("unsupported version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown frame kind {0}")]
    UnknownKind(u16),
    #[error("unexpected {0:?} frame")]
    UnexpectedKind(FrameKind),
    #[error("frame of {length} bytes exceeds limit of {max}")]
    FrameTooLarge { length: usize, max: usize },
    #[error("connection closed mid-frame")]
    Truncated,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Request,
    Response,
}

impl FrameKind {
    fn code(self) -> u16 {
        match self {
            FrameKind::Request => 1,
            FrameKind::Response => 2,
        }
    }

    fn from_code(code: u16) -> Result<Self, CodecError> {
        match code {
            1 => Ok(FrameKind::Request),
            2 => Ok(FrameKind::Response),
            other => Err(CodecError::UnknownKind(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub length: u32,
}

impl FrameHeader {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(MAGIC);
        buf.put_u16(VERSION);
        buf.put_u16(self.kind.code());
        buf.put_u32(self.length);
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self, CodecError> {
        if buf.remaining() < HEADER_LEN {
            return Err(CodecError::Truncated);
        }
        // Validate header before we trust the length.
        let magic = buf.get_u32();
        if magic != MAGIC {
            return Err(CodecError::InvalidMagic(magic));
        }
        let version = buf.get_u16();
        if version != VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let kind = FrameKind::from_code(buf.get_u16())?;
        let length = buf.get_u32();
        Ok(Self { kind, length })
    }
}

/// Header plus payload, ready to write.
pub fn encode_frame(kind: FrameKind, payload: &[u8]) -> Result<Bytes, CodecError> {
    let length = u32::try_from(payload.len()).map_err(|_| CodecError::FrameTooLarge {
        length: payload.len(),
        max: u32::MAX as usize,
    })?;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    FrameHeader { kind, length }.encode(&mut buf);
    buf.extend_from_slice(payload);
    Ok(buf.freeze())
}

/// Read one frame. `Ok(None)` means the peer closed cleanly between frames.
pub async fn read_frame<R>(
    reader: &mut R,
    max_len: usize,
) -> Result<Option<(FrameKind, Bytes)>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let first = reader.read(&mut header).await?;
    if first == 0 {
        return Ok(None);
    }
    read_exact(reader, &mut header[first..]).await?;

    let header = FrameHeader::decode(&header)?;
    let length = header.length as usize;
    if length > max_len {
        return Err(CodecError::FrameTooLarge {
            length,
            max: max_len,
        });
    }

    let mut payload = vec![0u8; length];
    read_exact(reader, &mut payload).await?;
    Ok(Some((header.kind, Bytes::from(payload))))
}

async fn read_exact<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<(), CodecError> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(CodecError::Truncated),
        Err(e) => Err(e.into()),
    }
}

/// Serialize `message` as JSON and write it as a single frame.
pub async fn write_message<W, T>(
    writer: &mut W,
    kind: FrameKind,
    message: &T,
) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    let frame = encode_frame(kind, &payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
