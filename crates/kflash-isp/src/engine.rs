//! Flashing engine
//!
//! [Flasher] drives the target from cold reset to rebooted firmware: board
//! detection, ISP greeting, SRAM bootloader upload, bootloader hand-off,
//! flash-mode initialization, baud renegotiation, chunked firmware writes,
//! and the final reboot. Phases are strictly serial; every packet send is
//! paired with the response read that follows it.

use sha2::{Digest, Sha256};

use crate::board::BoardVariant;
use crate::error::{Error, Result};
use crate::packet::{self, Response, RetCode};
use crate::progress::{CancelToken, JobBoard, JobPhase, StatusCallback};
use crate::protocol::*;
use crate::slip;
use crate::transport::Transport;

/// Retransmissions allowed per chunk before the last rejection becomes fatal.
const MAX_CHUNK_ATTEMPTS: u32 = 16;

/// One firmware blob destined for a flash address.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    /// Flash address the image is written to.
    pub address: u32,
    /// Image bytes, already word-reversed if the package asked for it.
    pub data: Vec<u8>,
    /// Whether to wrap the image in the length + SHA-256 envelope.
    pub sha256_prefix: bool,
}

/// The flashing state machine over a [Transport].
pub struct Flasher<T: Transport> {
    transport: T,
    board: Option<BoardVariant>,
    jobs: JobBoard,
    cancel: CancelToken,
    rx_frame: Vec<u8>,
    tx_frame: Vec<u8>,
}

impl<T: Transport> Flasher<T> {
    /// Creates an engine owning `transport` for the flashing lifetime.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            board: None,
            jobs: JobBoard::new(),
            cancel: CancelToken::new(),
            rx_frame: Vec::new(),
            tx_frame: Vec::new(),
        }
    }

    /// Installs the change-notification callback for status updates.
    pub fn set_notify(&mut self, notify: StatusCallback) {
        self.jobs.set_notify(notify);
    }

    /// The per-phase status map.
    pub fn jobs(&self) -> &JobBoard {
        &self.jobs
    }

    /// A token that cancels the run at the next phase or chunk boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The detected board variant, once detection has succeeded.
    pub fn board(&self) -> Option<BoardVariant> {
        self.board
    }

    /// Consumes the engine and returns the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Runs the whole flashing sequence for the given images, in order.
    pub fn flash(
        &mut self,
        bootloader: &[u8],
        images: &[FirmwareImage],
        baud: u32,
        chip: u32,
    ) -> Result<()> {
        self.detect_board()?;
        self.install_bootloader(bootloader)?;
        self.boot_bootloader()?;
        self.flash_greeting()?;
        self.change_baud(baud)?;
        self.init_flash(chip)?;
        for image in images {
            self.flash_firmware(image.address, &image.data, image.sha256_prefix)?;
        }
        self.reboot()
    }

    /// Tries each board variant until one answers the ISP greeting.
    ///
    /// A greeting timeout means the strap wiring did not match and the next
    /// variant is tried; any other failure propagates. The winning attempt
    /// already entered ISP mode and greeted the ROM, so `BootToIspMode` and
    /// `Greeting` are reported as completed sub-steps without a second wire
    /// exchange.
    pub fn detect_board(&mut self) -> Result<BoardVariant> {
        let variant = self.with_phase(JobPhase::DetectBoard, |s| {
            for variant in BoardVariant::ALL {
                variant.enter_isp(&mut s.transport)?;
                match s.greet_once(&ISP_GREETING) {
                    Ok(()) => {
                        log::info!("Detected {} board", variant.name());
                        s.board = Some(variant);
                        return Ok(variant);
                    }
                    Err(Error::Timeout) => {
                        log::debug!("No greeting with the {} strap sequence", variant.name());
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(Error::UnsupportedBoard)
        })?;
        for phase in [JobPhase::BootToIspMode, JobPhase::Greeting] {
            self.jobs.begin(phase);
            self.jobs.finish(phase);
        }
        Ok(variant)
    }

    /// Uploads the flash bootloader to SRAM in 1024-byte chunks.
    pub fn install_bootloader(&mut self, bootloader: &[u8]) -> Result<()> {
        self.with_phase(JobPhase::InstallFlashBootloader, |s| {
            s.stream_chunks(
                JobPhase::InstallFlashBootloader,
                ISP_MEMORY_WRITE,
                SRAM_LOAD_ADDR,
                bootloader,
                MEMORY_WRITE_CHUNK,
            )
        })
    }

    /// Jumps into the uploaded bootloader.
    ///
    /// The ROM hands the UART over without answering; the settle delay gives
    /// the bootloader time to come up before it is greeted.
    pub fn boot_bootloader(&mut self) -> Result<()> {
        log::info!("Booting flash bootloader");
        self.send_request(ISP_MEMORY_BOOT, SRAM_LOAD_ADDR, None)?;
        self.transport.delay_ms(BOOT_SETTLE_MS);
        Ok(())
    }

    /// Greets the flash bootloader; only `ISP_RET_OK` is accepted.
    pub fn flash_greeting(&mut self) -> Result<()> {
        self.with_phase(JobPhase::FlashGreeting, |s| s.greet_once(&FLASH_GREETING))
    }

    /// Renegotiates the UART to `baud` and reopens the port to match.
    ///
    /// The target switches immediately and cannot acknowledge at either rate,
    /// so no response is read; the next flash-mode exchange is the probe of
    /// the renegotiated line.
    pub fn change_baud(&mut self, baud: u32) -> Result<()> {
        self.with_phase(JobPhase::ChangeBaudRate, |s| {
            s.send_request(ISP_UARTHS_BAUDRATE_SET, 0, Some(&baud.to_le_bytes()))?;
            s.transport.close();
            s.transport.delay_ms(BAUD_SWITCH_SETTLE_MS);
            s.transport.reopen(baud)
        })
    }

    /// Selects and initializes the flash chip behind `chip`.
    pub fn init_flash(&mut self, chip: u32) -> Result<()> {
        self.with_phase(JobPhase::InitializeFlash, |s| {
            let resp = s.flash_init_once(chip)?;
            if resp.code.is_success() {
                return Ok(());
            }
            log::warn!("Flash init rejected with {:?}, retransmitting once", resp.code);
            let resp = s.flash_init_once(chip)?;
            if resp.code.is_success() {
                Ok(())
            } else {
                Err(Error::BadResponse {
                    op: resp.op,
                    code: resp.code,
                })
            }
        })
    }

    /// Streams one firmware image into flash at `address`.
    ///
    /// With `sha256_prefix` the image is wrapped in the length + digest
    /// envelope first. The envelope goes out in 4096-byte chunks and the
    /// packet address advances by the full chunk stride each time, short
    /// final chunk included.
    pub fn flash_firmware(&mut self, address: u32, data: &[u8], sha256_prefix: bool) -> Result<()> {
        self.with_phase(JobPhase::FlashFirmware, |s| {
            let envelope;
            let payload: &[u8] = if sha256_prefix {
                envelope = sha256_envelope(data);
                &envelope
            } else {
                data
            };
            s.stream_chunks(
                JobPhase::FlashFirmware,
                ISP_FLASH_WRITE,
                address,
                payload,
                FLASH_WRITE_CHUNK,
            )
        })
    }

    /// Resets the board into the freshly written firmware.
    pub fn reboot(&mut self) -> Result<()> {
        let board = self.require_board()?;
        self.with_phase(JobPhase::Reboot, |s| board.reboot(&mut s.transport))
    }

    fn with_phase<R>(
        &mut self,
        phase: JobPhase,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        self.check_cancel()?;
        self.jobs.begin(phase);
        match f(self) {
            Ok(value) => {
                self.jobs.finish(phase);
                Ok(value)
            }
            Err(e) => {
                self.jobs.fail(phase);
                Err(e)
            }
        }
    }

    fn require_board(&self) -> Result<BoardVariant> {
        self.board.ok_or(Error::UnsupportedBoard)
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    fn send_request(&mut self, op: u16, address: u32, payload: Option<&[u8]>) -> Result<()> {
        let packet = packet::build(op, address, payload);
        slip::encode_into(&packet, &mut self.tx_frame);
        self.transport.write(&self.tx_frame)
    }

    fn read_response(&mut self) -> Result<Response> {
        slip::read_frame(&mut self.transport, &mut self.rx_frame)?;
        packet::parse_response(&self.rx_frame)
    }

    fn flash_init_once(&mut self, chip: u32) -> Result<Response> {
        self.send_request(FLASHMODE_FLASH_INIT, chip, None)?;
        self.read_response()
    }

    fn greet_once(&mut self, greeting: &[u8]) -> Result<()> {
        self.transport.write(greeting)?;
        let resp = self.read_response()?;
        // Greetings accept Ok only; Default means the target is not the one
        // we think it is.
        if resp.code == RetCode::Ok {
            Ok(())
        } else {
            Err(Error::BadResponse {
                op: resp.op,
                code: resp.code,
            })
        }
    }

    fn stream_chunks(
        &mut self,
        phase: JobPhase,
        op: u16,
        base: u32,
        data: &[u8],
        chunk_size: usize,
    ) -> Result<()> {
        let total = data.len();
        let mut sent = 0usize;
        for (i, chunk) in data.chunks(chunk_size).enumerate() {
            self.check_cancel()?;
            let address = base + (i * chunk_size) as u32;
            self.write_chunk(op, address, chunk)?;
            sent += chunk.len();
            self.jobs.progress(phase, sent as f32 / total as f32);
        }
        Ok(())
    }

    fn write_chunk(&mut self, op: u16, address: u32, chunk: &[u8]) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.send_request(op, address, Some(chunk))?;
            let resp = self.read_response()?;
            if resp.code.is_success() {
                if attempt > 1 {
                    log::debug!("Chunk at {address:#010x} accepted after {attempt} attempts");
                }
                return Ok(());
            }
            if attempt >= MAX_CHUNK_ATTEMPTS {
                return Err(Error::BadResponse {
                    op: resp.op,
                    code: resp.code,
                });
            }
            log::warn!(
                "Chunk at {address:#010x} rejected with {:?}, retransmitting",
                resp.code
            );
        }
    }
}

/// Wraps `data` in the flash-write envelope:
/// `0x00`, the u32 LE data length, the data, then the SHA-256 digest of
/// everything preceding it.
pub fn sha256_envelope(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 4 + data.len() + 32);
    out.push(0x00);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    let digest = Sha256::digest(&out);
    out.extend_from_slice(&digest);
    out
}

/// Reverses the byte order within every aligned 4-byte word in place.
///
/// A trailing partial word is left untouched.
pub fn reverse_word_bytes(data: &mut [u8]) {
    for word in data.chunks_exact_mut(4) {
        word.reverse();
    }
}
