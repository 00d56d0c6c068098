//! Job phases, per-phase status, and the change-notification capability
//!
//! The engine mutates a [JobBoard]; everyone else observes it through an
//! injected callback. The callback receives a [StatusEvent::CurrentJob]
//! before any progress for that phase, so a UI can swap its active indicator
//! first. The callback is `Send`: a GUI runs the engine on a worker thread
//! and hands in a channel-backed callback whose receiver lives on the UI
//! thread, while the CLI consumes events inline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The phases a flashing run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    /// Probe board variants until one answers the greeting.
    DetectBoard,
    /// Drive the strap pins of the detected variant.
    BootToIspMode,
    /// Greet the boot ROM.
    Greeting,
    /// Upload the flash bootloader into SRAM.
    InstallFlashBootloader,
    /// Greet the bootloader after hand-off.
    FlashGreeting,
    /// Renegotiate the UART baud rate.
    ChangeBaudRate,
    /// Select and initialize the flash chip.
    InitializeFlash,
    /// Stream the firmware into flash.
    FlashFirmware,
    /// Reset the board into the new firmware.
    Reboot,
}

impl JobPhase {
    /// All phases in execution order.
    pub const ALL: [JobPhase; 9] = [
        JobPhase::DetectBoard,
        JobPhase::BootToIspMode,
        JobPhase::Greeting,
        JobPhase::InstallFlashBootloader,
        JobPhase::FlashGreeting,
        JobPhase::ChangeBaudRate,
        JobPhase::InitializeFlash,
        JobPhase::FlashFirmware,
        JobPhase::Reboot,
    ];

    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            JobPhase::DetectBoard => "Detect board",
            JobPhase::BootToIspMode => "Enter ISP mode",
            JobPhase::Greeting => "Greet boot ROM",
            JobPhase::InstallFlashBootloader => "Install flash bootloader",
            JobPhase::FlashGreeting => "Greet bootloader",
            JobPhase::ChangeBaudRate => "Change baud rate",
            JobPhase::InitializeFlash => "Initialize flash",
            JobPhase::FlashFirmware => "Flash firmware",
            JobPhase::Reboot => "Reboot",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Lifecycle of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunningState {
    /// The phase has not been entered yet.
    #[default]
    NotStarted,
    /// The phase is executing.
    Running,
    /// The phase completed successfully.
    Finished,
    /// The phase failed; progress keeps its last value.
    Error,
}

/// Observable state of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JobStatus {
    /// Lifecycle state.
    pub state: RunningState,
    /// Completion in `[0.0, 1.0]`; 1.0 exactly when `state` is `Finished`.
    pub progress: f32,
}

/// A change published by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEvent {
    /// The engine switched to a new phase.
    CurrentJob(JobPhase),
    /// A phase's status changed.
    Progress {
        /// The phase the update belongs to.
        phase: JobPhase,
        /// Its new status.
        status: JobStatus,
    },
}

/// Change-notification callback handed to the engine.
pub type StatusCallback = Box<dyn FnMut(StatusEvent) + Send>;

/// Per-phase status map, writable only by the engine.
#[derive(Default)]
pub struct JobBoard {
    statuses: [JobStatus; JobPhase::ALL.len()],
    notify: Option<StatusCallback>,
}

impl JobBoard {
    /// Creates a board with every phase `NotStarted` and no observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the change-notification callback.
    pub fn set_notify(&mut self, notify: StatusCallback) {
        self.notify = Some(notify);
    }

    /// Current status of a phase.
    pub fn status(&self, phase: JobPhase) -> JobStatus {
        self.statuses[phase.index()]
    }

    fn emit(&mut self, event: StatusEvent) {
        if let Some(notify) = &mut self.notify {
            notify(event);
        }
    }

    fn publish(&mut self, phase: JobPhase) {
        let status = self.statuses[phase.index()];
        self.emit(StatusEvent::Progress { phase, status });
    }

    pub(crate) fn begin(&mut self, phase: JobPhase) {
        log::info!("{}", phase.label());
        self.statuses[phase.index()] = JobStatus {
            state: RunningState::Running,
            progress: 0.0,
        };
        self.emit(StatusEvent::CurrentJob(phase));
        self.publish(phase);
    }

    pub(crate) fn progress(&mut self, phase: JobPhase, progress: f32) {
        self.statuses[phase.index()].progress = progress.clamp(0.0, 1.0);
        self.publish(phase);
    }

    pub(crate) fn finish(&mut self, phase: JobPhase) {
        self.statuses[phase.index()] = JobStatus {
            state: RunningState::Finished,
            progress: 1.0,
        };
        self.publish(phase);
    }

    pub(crate) fn fail(&mut self, phase: JobPhase) {
        self.statuses[phase.index()].state = RunningState::Error;
        self.publish(phase);
    }
}

/// Cooperative cancellation flag, checked at phase and chunk boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn observed_board() -> (JobBoard, mpsc::Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel();
        let mut board = JobBoard::new();
        board.set_notify(Box::new(move |event| {
            let _ = tx.send(event);
        }));
        (board, rx)
    }

    #[test]
    fn begin_resets_progress_and_announces_phase_first() {
        let (mut board, rx) = observed_board();
        board.begin(JobPhase::FlashFirmware);

        assert_eq!(
            rx.try_recv().unwrap(),
            StatusEvent::CurrentJob(JobPhase::FlashFirmware)
        );
        match rx.try_recv().unwrap() {
            StatusEvent::Progress { phase, status } => {
                assert_eq!(phase, JobPhase::FlashFirmware);
                assert_eq!(status.state, RunningState::Running);
                assert_eq!(status.progress, 0.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn finish_forces_full_progress() {
        let (mut board, _rx) = observed_board();
        board.begin(JobPhase::InstallFlashBootloader);
        board.progress(JobPhase::InstallFlashBootloader, 0.4);
        board.finish(JobPhase::InstallFlashBootloader);

        let status = board.status(JobPhase::InstallFlashBootloader);
        assert_eq!(status.state, RunningState::Finished);
        assert_eq!(status.progress, 1.0);
    }

    #[test]
    fn fail_keeps_last_progress() {
        let (mut board, _rx) = observed_board();
        board.begin(JobPhase::FlashFirmware);
        board.progress(JobPhase::FlashFirmware, 0.75);
        board.fail(JobPhase::FlashFirmware);

        let status = board.status(JobPhase::FlashFirmware);
        assert_eq!(status.state, RunningState::Error);
        assert_eq!(status.progress, 0.75);
    }

    #[test]
    fn untouched_phases_stay_not_started() {
        let (mut board, _rx) = observed_board();
        board.begin(JobPhase::DetectBoard);
        assert_eq!(
            board.status(JobPhase::Reboot).state,
            RunningState::NotStarted
        );
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
