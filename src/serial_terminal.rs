use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

/// Every directive and every response line ends with this byte.
pub const TERMINATOR: u8 = b'\n';

/// Read timeout of the underlying serial port. Kept short so that the line
/// reader can enforce its own, much longer, inactivity timeout.
const PORT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Longest response line accepted unless configured otherwise. Fits a full
/// 10000 point ASCII curve.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum TdsTerminalError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout error: no line terminator within {timeout:?}, received '{received}'")]
    Timeout { timeout: Duration, received: String },

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Response line exceeds {limit} bytes without a terminator")]
    LineTooLong { limit: usize },
}

/// Line oriented terminal to a TDS oscilloscope.
///
/// Directives are written with a trailing [`TERMINATOR`]; responses are read
/// back one byte at a time until the terminator shows up, so nothing past the
/// end of the current line is ever consumed from the port.
#[derive(Debug)]
pub struct TdsTerminal<P = Box<dyn SerialPort>> {
    port: P,
    timeout: Duration,
    max_line_length: usize,
}

impl TdsTerminal {
    /// Open a serial port and wrap it in a terminal
    pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TdsTerminalError> {
        log::debug!("Opening {} at {} baud", port, baud_rate);
        let serial = serialport::new(port, baud_rate)
            .timeout(PORT_POLL_TIMEOUT)
            .open()?;

        let mut terminal = Self::new(serial, timeout);
        terminal.flush()?;
        Ok(terminal)
    }

    /// Drop whatever is still sitting in the serial buffers
    fn flush(&mut self) -> Result<(), TdsTerminalError> {
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

impl<P: Read + Write> TdsTerminal<P> {
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Bound the bytes `read_line` accepts, so a port streaming garbage
    /// without terminators fails instead of growing the buffer forever.
    pub fn set_max_line_length(&mut self, limit: usize) {
        self.max_line_length = limit;
    }

    pub fn get_ref(&self) -> &P {
        &self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    /// Send a single directive. No response is read.
    pub fn write_directive(&mut self, directive: &str) -> Result<(), TdsTerminalError> {
        log::trace!("-> {}", directive);
        let directive_with_newline = format!("{}\n", directive);
        self.port.write_all(directive_with_newline.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one response line, terminator included.
    ///
    /// The timeout counts from the last received byte, so a long curve trickling
    /// in at 9600 baud does not trip it as long as the instrument keeps talking.
    /// A line longer than the configured maximum is rejected.
    pub fn read_line(&mut self) -> Result<String, TdsTerminalError> {
        profile_zone!("read_line");

        let mut response = Vec::new();
        let mut last_activity = Instant::now();

        loop {
            let mut byte = [0u8; 1];
            match self.port.read(&mut byte) {
                Ok(1) => {
                    response.push(byte[0]);
                    last_activity = Instant::now();
                    if byte[0] == TERMINATOR {
                        break;
                    }
                    if response.len() >= self.max_line_length {
                        return Err(TdsTerminalError::LineTooLong {
                            limit: self.max_line_length,
                        });
                    }
                    continue;
                }
                Ok(_) => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e.into()),
            }

            if last_activity.elapsed() >= self.timeout {
                let received = String::from_utf8_lossy(&response).to_string();
                return Err(TdsTerminalError::Timeout {
                    timeout: self.timeout,
                    received,
                });
            }
        }

        let line = String::from_utf8(response)?;
        log::trace!("<- {}", line.trim_end());
        Ok(line)
    }

    /// Send a query and read exactly one response line
    pub fn query(&mut self, directive: &str) -> Result<String, TdsTerminalError> {
        self.write_directive(directive)?;
        self.read_line()
    }
}

/// Format a number the way the instrument documents NR3 arguments, e.g. `4E-5`.
pub(crate) fn nr3(value: f64) -> String {
    format!("{:E}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_port::MockPort;

    fn terminal(port: MockPort) -> TdsTerminal<MockPort> {
        TdsTerminal::new(port, Duration::from_millis(20))
    }

    #[test]
    fn test_read_line_stops_at_first_terminator() {
        let mut serial = terminal(MockPort::with_bytes(b"first\nsecond\nthird"));

        assert_eq!(serial.read_line().unwrap(), "first\n");
        assert_eq!(serial.read_line().unwrap(), "second\n");
        assert_eq!(serial.get_ref().remaining(), b"third".len());
    }

    #[test]
    fn test_read_line_keeps_empty_lines() {
        let mut serial = terminal(MockPort::with_bytes(b"\n\nx\n"));

        assert_eq!(serial.read_line().unwrap(), "\n");
        assert_eq!(serial.read_line().unwrap(), "\n");
        assert_eq!(serial.read_line().unwrap(), "x\n");
    }

    #[test]
    fn test_read_line_times_out_without_terminator() {
        let mut serial = terminal(MockPort::with_bytes(b"partial"));

        let err = serial.read_line().unwrap_err();
        assert!(matches!(
            err,
            TdsTerminalError::Timeout { ref received, .. } if received == "partial"
        ));
    }

    #[test]
    fn test_read_line_rejects_endless_line() {
        let mut serial = terminal(MockPort::with_bytes(&[b'a'; 64]));
        serial.set_max_line_length(16);

        assert!(matches!(
            serial.read_line(),
            Err(TdsTerminalError::LineTooLong { limit: 16 })
        ));
        assert_eq!(serial.get_ref().remaining(), 64 - 16);
    }

    #[test]
    fn test_read_line_accepts_line_at_limit() {
        let mut serial = terminal(MockPort::with_bytes(b"0123456789abcde\n"));
        serial.set_max_line_length(16);

        assert_eq!(serial.read_line().unwrap(), "0123456789abcde\n");
    }

    #[test]
    fn test_read_line_rejects_invalid_utf8() {
        let mut serial = terminal(MockPort::with_bytes(&[0xff, 0xfe, b'\n']));

        assert!(matches!(serial.read_line(), Err(TdsTerminalError::Utf8(_))));
    }

    #[test]
    fn test_query_writes_terminated_directive() {
        let mut serial = terminal(MockPort::with_lines(&["TEKTRONIX,TDS 3054,0,v3.27"]));

        let response = serial.query("*IDN?").unwrap();

        assert_eq!(response, "TEKTRONIX,TDS 3054,0,v3.27\n");
        assert_eq!(serial.get_ref().written(), b"*IDN?\n");
    }

    #[test]
    fn test_write_error_is_reported() {
        let mut serial = terminal(MockPort::failing_writes());

        assert!(matches!(
            serial.write_directive("ACQuire:MODe SAMple"),
            Err(TdsTerminalError::Io(_))
        ));
    }

    #[test]
    fn test_nr3() {
        assert_eq!(nr3(40e-6), "4E-5");
        assert_eq!(nr3(1.5), "1.5E0");
        assert_eq!(nr3(2.0), "2E0");
        assert_eq!(nr3(0.0), "0E0");
    }
}
