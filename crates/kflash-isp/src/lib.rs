//! kflash-isp - Kendryte K210 ISP protocol and flashing engine
//!
//! This crate speaks the serial In-System-Programming protocol of the K210
//! boot ROM and of the SRAM flash bootloader: SLIP framing, CRC32-protected
//! packets, board-specific DTR/RTS strap sequences, and the phase state
//! machine that takes a board from cold reset to rebooted firmware.
//!
//! # Example
//!
//! ```no_run
//! use kflash_isp::{Flasher, FirmwareImage, SerialTransport};
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0")?;
//! let mut flasher = Flasher::new(transport);
//!
//! let images = [FirmwareImage {
//!     address: 0,
//!     data: std::fs::read("firmware.bin")?,
//!     sha256_prefix: true,
//! }];
//! let bootloader = std::fs::read("isp_loader.bin")?;
//! flasher.flash(&bootloader, &images, 2_000_000, kflash_isp::protocol::FLASH_CHIP_SPI)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod board;
pub mod engine;
pub mod error;
pub mod packet;
pub mod progress;
pub mod protocol;
pub mod slip;
pub mod transport;

pub use board::BoardVariant;
pub use engine::{reverse_word_bytes, sha256_envelope, FirmwareImage, Flasher};
pub use error::{Error, Result};
pub use packet::{Response, RetCode};
pub use progress::{CancelToken, JobBoard, JobPhase, JobStatus, RunningState, StatusEvent};
pub use transport::{SerialTransport, Transport};
