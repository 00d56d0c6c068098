//! Request packet builder and response parser
//!
//! Every request shares a 16-byte header:
//!
//! ```text
//! offset  0..2   u16 LE  operation code
//! offset  2..4   u16 LE  reserved, zero
//! offset  4..8   u32 LE  CRC32 (IEEE) over bytes [8..]
//! offset  8..12  u32 LE  target address
//! offset 12..16  u32 LE  payload length
//! offset 16..            payload
//! ```
//!
//! The checksum field reads as zero while the CRC is computed and is
//! overwritten afterwards, so the CRC covers everything that follows it.

use crate::error::{Error, Result};

/// Size of the request header in bytes.
pub const HEADER_LEN: usize = 16;

/// Builds a request packet body, ready for SLIP framing.
pub fn build(op: u16, address: u32, payload: Option<&[u8]>) -> Vec<u8> {
    let body_len = payload.map_or(0, <[u8]>::len);
    let mut buf = vec![0u8; HEADER_LEN + body_len];

    buf[0..2].copy_from_slice(&op.to_le_bytes());
    buf[8..12].copy_from_slice(&address.to_le_bytes());
    if let Some(payload) = payload {
        buf[12..16].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        buf[16..].copy_from_slice(payload);
    }

    let crc = crc32fast::hash(&buf[8..]);
    buf[4..8].copy_from_slice(&crc.to_le_bytes());
    buf
}

/// Return code carried in the second byte of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetCode {
    /// Placeholder some ROM revisions send instead of `Ok`.
    Default,
    /// Operation accepted.
    Ok,
    /// Payload length rejected.
    BadDataLen,
    /// Packet checksum mismatch.
    BadDataChecksum,
    /// Operation code not recognized.
    InvalidCommand,
    /// Anything else seen on the wire.
    Unknown(u8),
}

impl From<u8> for RetCode {
    fn from(raw: u8) -> Self {
        use crate::protocol::*;
        match raw {
            ISP_RET_DEFAULT => RetCode::Default,
            ISP_RET_OK => RetCode::Ok,
            ISP_RET_BAD_DATA_LEN => RetCode::BadDataLen,
            ISP_RET_BAD_DATA_CHECKSUM => RetCode::BadDataChecksum,
            ISP_RET_INVALID_COMMAND => RetCode::InvalidCommand,
            other => RetCode::Unknown(other),
        }
    }
}

impl RetCode {
    /// Whether this code counts as success outside of greetings.
    ///
    /// Greetings are stricter and accept `Ok` only.
    pub fn is_success(self) -> bool {
        matches!(self, RetCode::Ok | RetCode::Default)
    }
}

/// A decoded `(op, code)` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Operation code echoed by the target.
    pub op: u8,
    /// Return code.
    pub code: RetCode,
}

/// Parses a decoded SLIP payload into a [Response].
pub fn parse_response(frame: &[u8]) -> Result<Response> {
    if frame.len() < 2 {
        return Err(Error::TruncatedResponse(frame.len()));
    }
    Ok(Response {
        op: frame[0],
        code: RetCode::from(frame[1]),
    })
}
