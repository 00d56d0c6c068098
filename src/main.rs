//! kflash - Kendryte K210 firmware flasher
//!
//! Uploads a flash bootloader into SRAM over the boot ROM's serial ISP
//! protocol, hands execution over to it, and streams firmware images into
//! the on-package SPI flash.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Map verbosity onto the log filter before the logger starts.
    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match cli.command {
        Commands::Flash {
            device,
            baudrate,
            firmware,
        } => commands::run_flash(&device, baudrate, &firmware),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
