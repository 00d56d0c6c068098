//! Board-specific DTR/RTS sequences
//!
//! The K210 boot strap and reset pins are wired to the UART bridge's DTR and
//! RTS lines differently across board families. Each variant knows the edge
//! sequence that drops the chip into ISP mode and the one that reboots it
//! into the freshly written firmware.

use crate::error::Result;
use crate::transport::Transport;

/// Delay between edges on KD233-wired boards.
const KD233_EDGE_MS: u64 = 50;
/// Delay between edges on generically wired boards.
const GENERIC_EDGE_MS: u64 = 10;

/// Known board wirings, tried in declaration order during detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardVariant {
    /// Canaan KD233 reference board.
    Kd233,
    /// Dan/Maix style boards with the common strap wiring.
    Generic,
}

impl BoardVariant {
    /// Detection order.
    pub const ALL: [BoardVariant; 2] = [BoardVariant::Kd233, BoardVariant::Generic];

    /// Human-readable variant name for logs.
    pub fn name(self) -> &'static str {
        match self {
            BoardVariant::Kd233 => "KD233",
            BoardVariant::Generic => "generic",
        }
    }

    /// Drives the strap pins so the chip resets into the ISP boot ROM.
    pub fn enter_isp<T: Transport + ?Sized>(self, t: &mut T) -> Result<()> {
        log::debug!("Entering ISP mode with the {} sequence", self.name());
        match self {
            BoardVariant::Kd233 => {
                t.set_dtr(true)?;
                t.set_rts(true)?;
                t.delay_ms(KD233_EDGE_MS);
                t.set_dtr(false)?;
                t.delay_ms(KD233_EDGE_MS);
            }
            BoardVariant::Generic => {
                t.set_dtr(false)?;
                t.set_rts(false)?;
                t.delay_ms(GENERIC_EDGE_MS);
                t.set_rts(true)?;
                t.delay_ms(GENERIC_EDGE_MS);
                t.set_rts(false)?;
                t.set_dtr(true)?;
                t.delay_ms(GENERIC_EDGE_MS);
            }
        }
        Ok(())
    }

    /// Resets the chip with the boot strap released so it runs from flash.
    pub fn reboot<T: Transport + ?Sized>(self, t: &mut T) -> Result<()> {
        log::debug!("Rebooting with the {} sequence", self.name());
        match self {
            BoardVariant::Kd233 => {
                t.set_dtr(false)?;
                t.set_rts(true)?;
                t.delay_ms(KD233_EDGE_MS);
                t.set_rts(false)?;
                t.delay_ms(KD233_EDGE_MS);
            }
            BoardVariant::Generic => {
                t.set_dtr(false)?;
                t.set_rts(false)?;
                t.delay_ms(GENERIC_EDGE_MS);
                t.set_rts(true)?;
                t.delay_ms(GENERIC_EDGE_MS);
                t.set_rts(false)?;
                t.delay_ms(GENERIC_EDGE_MS);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[derive(Debug, PartialEq, Eq)]
    enum Edge {
        Dtr(bool),
        Rts(bool),
        Wait(u64),
    }

    #[derive(Default)]
    struct LineRecorder(Vec<Edge>);

    impl Transport for LineRecorder {
        fn write(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn read_byte(&mut self) -> Result<u8> {
            unreachable!("board sequences never read")
        }

        fn set_dtr(&mut self, level: bool) -> Result<()> {
            self.0.push(Edge::Dtr(level));
            Ok(())
        }

        fn set_rts(&mut self, level: bool) -> Result<()> {
            self.0.push(Edge::Rts(level));
            Ok(())
        }

        fn close(&mut self) {}

        fn reopen(&mut self, _baud: u32) -> Result<()> {
            Ok(())
        }

        fn delay_ms(&mut self, ms: u64) {
            self.0.push(Edge::Wait(ms));
        }
    }

    #[test]
    fn kd233_isp_sequence() {
        let mut rec = LineRecorder::default();
        BoardVariant::Kd233.enter_isp(&mut rec).unwrap();
        assert_eq!(
            rec.0,
            [
                Edge::Dtr(true),
                Edge::Rts(true),
                Edge::Wait(50),
                Edge::Dtr(false),
                Edge::Wait(50),
            ]
        );
    }

    #[test]
    fn generic_isp_sequence() {
        let mut rec = LineRecorder::default();
        BoardVariant::Generic.enter_isp(&mut rec).unwrap();
        assert_eq!(
            rec.0,
            [
                Edge::Dtr(false),
                Edge::Rts(false),
                Edge::Wait(10),
                Edge::Rts(true),
                Edge::Wait(10),
                Edge::Rts(false),
                Edge::Dtr(true),
                Edge::Wait(10),
            ]
        );
    }

    #[test]
    fn reboot_releases_boot_strap() {
        // Neither variant may leave the board with DTR asserted after reboot,
        // otherwise the chip would re-enter ISP mode on the next reset.
        for variant in BoardVariant::ALL {
            let mut rec = LineRecorder::default();
            variant.reboot(&mut rec).unwrap();
            let last_dtr = rec.0.iter().rev().find_map(|e| match e {
                Edge::Dtr(level) => Some(*level),
                _ => None,
            });
            assert_eq!(last_dtr, Some(false), "{}", variant.name());
        }
    }
}
