//! Serial transport abstraction
//!
//! The engine talks to the target through the [Transport] trait so that the
//! wire protocol can be exercised against an in-memory double in tests.
//! [SerialTransport] is the hardware implementation over a native port.

use std::io::Read;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::error::{Error, Result};
use crate::protocol::{INITIAL_BAUD, READ_TIMEOUT_MS};

/// Byte-level I/O plus the modem control lines the boot straps hang off.
pub trait Transport {
    /// Write all bytes to the target.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read a single byte, blocking up to the port's read timeout.
    ///
    /// Exceeding the timeout fails with [Error::Timeout].
    fn read_byte(&mut self) -> Result<u8>;

    /// Set the DTR line.
    fn set_dtr(&mut self, level: bool) -> Result<()>;

    /// Set the RTS line.
    fn set_rts(&mut self, level: bool) -> Result<()>;

    /// Close the port. Subsequent I/O fails until [Transport::reopen].
    fn close(&mut self);

    /// Open the port again at the given baud rate.
    fn reopen(&mut self, baud: u32) -> Result<()>;

    /// Sleep for `ms` milliseconds between control-line edges.
    fn delay_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// [Transport] over a native serial port, 8-N-1 with a 2 s read timeout.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    path: String,
}

impl SerialTransport {
    /// Opens `device` at the 115 200 baud the boot ROM listens at.
    pub fn open(device: &str) -> Result<Self> {
        let port = Self::open_port(device, INITIAL_BAUD)?;
        log::info!("Opened serial port {} at {} baud", device, INITIAL_BAUD);
        Ok(Self {
            port: Some(port),
            path: device.to_string(),
        })
    }

    fn open_port(device: &str, baud: u32) -> Result<Box<dyn SerialPort>> {
        let port = serialport::new(device, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()?;
        Ok(port)
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(Error::PortClosed)
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;
        std::io::Write::write_all(port, data)?;
        std::io::Write::flush(port)?;
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        match self.port()?.read_exact(&mut buf) {
            Ok(()) => Ok(buf[0]),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(Error::Timeout),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn set_dtr(&mut self, level: bool) -> Result<()> {
        self.port()?.write_data_terminal_ready(level)?;
        Ok(())
    }

    fn set_rts(&mut self, level: bool) -> Result<()> {
        self.port()?.write_request_to_send(level)?;
        Ok(())
    }

    fn close(&mut self) {
        self.port = None;
    }

    fn reopen(&mut self, baud: u32) -> Result<()> {
        self.port = None;
        self.port = Some(Self::open_port(&self.path, baud)?);
        log::debug!("Reopened serial port {} at {} baud", self.path, baud);
        Ok(())
    }
}
