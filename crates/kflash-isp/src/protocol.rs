//! ISP wire protocol constants
//!
//! Operation and return codes spoken by the K210 boot ROM and by the SRAM
//! flash bootloader once it has taken over the UART.

/// Write a block of data into target SRAM.
pub const ISP_MEMORY_WRITE: u16 = 0xC3;
/// Jump to an address in target SRAM.
pub const ISP_MEMORY_BOOT: u16 = 0xC5;
/// Write a block of data into SPI flash (flash-mode only).
pub const ISP_FLASH_WRITE: u16 = 0xD4;
/// Renegotiate the high-speed UART baud rate (flash-mode only).
pub const ISP_UARTHS_BAUDRATE_SET: u16 = 0xD6;
/// Select and initialize a flash chip (flash-mode only).
pub const FLASHMODE_FLASH_INIT: u16 = 0xD7;

/// Return code placeholder some ROM revisions send instead of `ISP_RET_OK`.
pub const ISP_RET_DEFAULT: u8 = 0x00;
/// Operation accepted.
pub const ISP_RET_OK: u8 = 0xE0;
/// Payload length rejected.
pub const ISP_RET_BAD_DATA_LEN: u8 = 0xE1;
/// Packet checksum mismatch.
pub const ISP_RET_BAD_DATA_CHECKSUM: u8 = 0xE2;
/// Operation code not recognized.
pub const ISP_RET_INVALID_COMMAND: u8 = 0xE3;

/// Greeting NOP for the boot ROM, pre-framed (SLIP delimiters included).
pub const ISP_GREETING: [u8; 15] = [
    0xC0, 0xC2, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0,
];
/// Greeting NOP for the flash bootloader, pre-framed.
pub const FLASH_GREETING: [u8; 15] = [
    0xC0, 0xD2, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0,
];

/// SRAM address the flash bootloader is loaded to and booted from.
pub const SRAM_LOAD_ADDR: u32 = 0x8000_0000;

/// Payload size per `ISP_MEMORY_WRITE` packet during bootloader upload.
pub const MEMORY_WRITE_CHUNK: usize = 1024;
/// Payload size per `ISP_FLASH_WRITE` packet; also the per-chunk address stride.
pub const FLASH_WRITE_CHUNK: usize = 4096;

/// Chip index of the on-package SPI flash.
pub const FLASH_CHIP_SPI: u32 = 1;

/// Baud rate the boot ROM listens at; the port is always opened at this rate.
pub const INITIAL_BAUD: u32 = 115_200;

/// Serial read timeout in milliseconds.
pub const READ_TIMEOUT_MS: u64 = 2000;

/// Settle time after `ISP_MEMORY_BOOT` before the bootloader answers.
pub const BOOT_SETTLE_MS: u64 = 2000;

/// Pause between closing the port and reopening it at the renegotiated baud.
pub const BAUD_SWITCH_SETTLE_MS: u64 = 50;
