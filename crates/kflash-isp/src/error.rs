//! Error types for ISP communication and flashing

use thiserror::Error;

use crate::packet::RetCode;

/// Errors raised while driving the target over the serial ISP protocol.
#[derive(Debug, Error)]
pub enum Error {
    /// A blocking serial read exceeded the 2 s deadline.
    #[error("serial read timed out")]
    Timeout,

    /// SLIP decoder saw `0xDB` followed by something other than `0xDC`/`0xDD`.
    #[error("invalid SLIP escape byte 0x{0:02X}")]
    InvalidEscape(u8),

    /// A decoded frame was too short to carry an (op, code) pair.
    #[error("response frame too short: {0} bytes")]
    TruncatedResponse(usize),

    /// The target answered with a non-success return code.
    #[error("unexpected response to op 0x{op:02X}: {code:?}")]
    BadResponse {
        /// Operation code echoed by the target.
        op: u8,
        /// Return code carried in the response.
        code: RetCode,
    },

    /// Every board variant was tried and none answered the ISP greeting.
    #[error("no supported board answered the greeting")]
    UnsupportedBoard,

    /// The flashing sequence was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// An operation needed the serial port while it was closed.
    #[error("serial port is not open")]
    PortClosed,

    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ISP operations.
pub type Result<T> = std::result::Result<T, Error>;
