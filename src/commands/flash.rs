//! Flash command implementation

use indicatif::{ProgressBar, ProgressStyle};
use kflash_isp::{
    protocol, FirmwareImage, Flasher, JobPhase, RunningState, SerialTransport, StatusEvent,
};
use kflash_pkg::FlashPackage;
use std::path::Path;

/// Granularity of the per-phase progress bars.
const PROGRESS_TICKS: u64 = 1000;

/// Flash bootloader uploaded into SRAM before flash-mode operations.
static ISP_LOADER: &[u8] = include_bytes!("../../resources/isp_loader.bin");

/// Progress reporter bridging engine status events onto indicatif bars
struct FlashProgress {
    bar: Option<ProgressBar>,
    phase: Option<JobPhase>,
}

impl FlashProgress {
    fn new() -> Self {
        Self {
            bar: None,
            phase: None,
        }
    }

    fn handle(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::CurrentJob(phase) => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
                let bar = ProgressBar::new(PROGRESS_TICKS);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                bar.set_message(phase.label());
                self.bar = Some(bar);
                self.phase = Some(phase);
            }
            StatusEvent::Progress { phase, status } => {
                if self.phase != Some(phase) {
                    return;
                }
                let Some(bar) = &self.bar else { return };
                bar.set_position((status.progress * PROGRESS_TICKS as f32) as u64);
                match status.state {
                    RunningState::Finished => {
                        bar.finish_with_message(format!("{} done", phase.label()));
                        self.bar = None;
                    }
                    RunningState::Error => {
                        bar.abandon_with_message(format!("{} failed", phase.label()));
                        self.bar = None;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Run the flash command
pub fn run_flash(
    device: &str,
    baudrate: u32,
    firmware: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if baudrate < 110 {
        return Err(format!("baud rate {} is below the minimum of 110", baudrate).into());
    }

    // Load and validate the firmware before any serial traffic so input
    // problems never leave the board half-programmed.
    let images = load_images(firmware)?;
    let total: usize = images.iter().map(|image| image.data.len()).sum();
    println!("Loaded {} image(s), {} bytes total", images.len(), total);

    let transport = SerialTransport::open(device)?;
    let mut flasher = Flasher::new(transport);

    let mut progress = FlashProgress::new();
    flasher.set_notify(Box::new(move |event| progress.handle(event)));

    flasher.flash(ISP_LOADER, &images, baudrate, protocol::FLASH_CHIP_SPI)?;

    println!("Flash complete!");
    Ok(())
}

/// Load the firmware images the given path describes
fn load_images(path: &Path) -> Result<Vec<FirmwareImage>, Box<dyn std::error::Error>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("bin") => {
            let data = std::fs::read(path)?;
            log::info!("Read {} bytes from {:?}", data.len(), path);
            Ok(vec![FirmwareImage {
                address: 0,
                data,
                sha256_prefix: true,
            }])
        }
        Some("kfpkg") => {
            let mut package = FlashPackage::open(path)?;
            log::info!(
                "Package version {} with {} file(s)",
                package.version(),
                package.files().len()
            );
            let specs = package.files().to_vec();
            let mut images = Vec::with_capacity(specs.len());
            for spec in &specs {
                let mut file = package.open_file(spec)?;
                let mut data = file.read_all()?;
                if spec.reverse_4_bytes {
                    kflash_isp::reverse_word_bytes(&mut data);
                }
                images.push(FirmwareImage {
                    address: spec.address,
                    data,
                    sha256_prefix: spec.sha256_prefix,
                });
            }
            Ok(images)
        }
        _ => Err(format!(
            "unsupported firmware extension in {:?}; expected .bin or .kfpkg",
            path
        )
        .into()),
    }
}
