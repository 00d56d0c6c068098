//! SLIP framing (RFC 1055)
//!
//! Requests are escaped into a caller-owned buffer that is reused across
//! packets; responses are pulled byte-by-byte off the transport until a
//! complete frame has been collected.

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape introducer.
pub const ESC: u8 = 0xDB;
/// Escaped form of `END`.
pub const ESC_END: u8 = 0xDC;
/// Escaped form of `ESC`.
pub const ESC_ESC: u8 = 0xDD;

/// Frames `payload` into `out`, replacing its previous contents.
pub fn encode_into(payload: &[u8], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(payload.len() + 2);
    out.push(END);
    for &b in payload {
        match b {
            END => {
                out.push(ESC);
                out.push(ESC_END);
            }
            ESC => {
                out.push(ESC);
                out.push(ESC_ESC);
            }
            _ => out.push(b),
        }
    }
    out.push(END);
}

/// Frames `payload` into a fresh buffer.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(payload, &mut out);
    out
}

/// Reads one SLIP frame from the transport into `out`.
///
/// Bytes before the opening delimiter are discarded; the next unescaped
/// delimiter ends the frame. An empty frame decodes to an empty payload, so
/// `read_frame` over `encode(payload)` recovers `payload` for every input.
pub fn read_frame<T: Transport + ?Sized>(transport: &mut T, out: &mut Vec<u8>) -> Result<()> {
    out.clear();

    loop {
        if transport.read_byte()? == END {
            break;
        }
    }

    loop {
        match transport.read_byte()? {
            END => return Ok(()),
            ESC => match transport.read_byte()? {
                ESC_END => out.push(END),
                ESC_ESC => out.push(ESC),
                other => return Err(Error::InvalidEscape(other)),
            },
            b => out.push(b),
        }
    }
}
