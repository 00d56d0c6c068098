//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kflash")]
#[command(author, version, about = "Kendryte K210 firmware flasher", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Flash a firmware image or package to the board
    Flash {
        /// Serial device the board is connected to (e.g., "/dev/ttyUSB0")
        #[arg(short, long)]
        device: String,

        /// Baud rate used for the firmware transfer
        #[arg(short, long, default_value_t = 2_000_000)]
        baudrate: u32,

        /// Firmware to flash (.bin or .kfpkg)
        firmware: PathBuf,
    },
}
