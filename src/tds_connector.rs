use crate::acquisition_config::ConfigError;
use crate::serial_terminal::{TdsTerminal, TdsTerminalError};
use serialport::SerialPortType;
use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a candidate port gets to answer `*IDN?` during discovery
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial link parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    /// Port to open. `None` probes every available port.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TdsDevice {
    pub port: String,
    pub description: String,
}

impl TdsDevice {
    pub fn new(port: String, description: String) -> Self {
        Self { port, description }
    }
}

/// Answer to `*IDN?`, e.g. `TEKTRONIX,TDS 3054,0,CF:91.1CT FV:v3.27`.
///
/// Parsed leniently; missing fields are left empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identification {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware: String,
}

impl Identification {
    pub fn parse(response: &str) -> Self {
        let mut fields = response.trim().splitn(4, ',').map(|f| f.trim().to_string());
        Self {
            manufacturer: fields.next().unwrap_or_default(),
            model: fields.next().unwrap_or_default(),
            serial_number: fields.next().unwrap_or_default(),
            firmware: fields.next().unwrap_or_default(),
        }
    }
}

impl fmt::Display for Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (serial {}, firmware {})",
            self.manufacturer, self.model, self.serial_number, self.firmware
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TdsConnectorError {
    #[error("Serial terminal error: {0}")]
    SerialTerminal(#[from] TdsTerminalError),

    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("Invalid acquisition configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("No oscilloscope answered on any serial port. Please connect one or specify the port manually")]
    DeviceNotFound,
}

pub struct TdsConnector;

impl TdsConnector {
    /// Open the configured port, or the first port whose device answers `*IDN?`
    pub fn connect(settings: &SerialSettings) -> Result<TdsTerminal, TdsConnectorError> {
        if let Some(port) = &settings.port {
            log::debug!("Connecting to oscilloscope on port {}", port);
            return Ok(TdsTerminal::open(port, settings.baud_rate, settings.timeout)?);
        }
        Self::get_working_serial(settings)
    }

    /// List all serial ports of this machine
    pub fn get_available_devices() -> Result<Vec<TdsDevice>, TdsConnectorError> {
        let devices = serialport::available_ports()?
            .into_iter()
            .map(|info| {
                let description = match info.port_type {
                    SerialPortType::UsbPort(usb) => format!(
                        "USB {:04x}:{:04x} {}",
                        usb.vid,
                        usb.pid,
                        usb.product.unwrap_or_default()
                    ),
                    SerialPortType::PciPort => "PCI serial port".to_string(),
                    SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
                    SerialPortType::Unknown => "Serial port".to_string(),
                };
                TdsDevice::new(info.port_name, description)
            })
            .collect();
        Ok(devices)
    }

    /// Ask the instrument behind `terminal` who it is
    pub fn probe<P: Read + Write>(
        terminal: &mut TdsTerminal<P>,
    ) -> Result<Identification, TdsTerminalError> {
        let response = terminal.query("*IDN?")?;
        Ok(Identification::parse(&response))
    }

    fn get_working_serial(settings: &SerialSettings) -> Result<TdsTerminal, TdsConnectorError> {
        for device in Self::get_available_devices()? {
            log::debug!("Probing {} ({})", device.port, device.description);
            let mut terminal = match TdsTerminal::open(&device.port, settings.baud_rate, PROBE_TIMEOUT)
            {
                Ok(terminal) => terminal,
                Err(e) => {
                    log::debug!("Cannot open {}: {}", device.port, e);
                    continue;
                }
            };

            match Self::probe(&mut terminal) {
                Ok(identification) => {
                    log::info!("Found {} on {}", identification, device.port);
                    terminal.set_timeout(settings.timeout);
                    return Ok(terminal);
                }
                Err(e) => log::debug!("No answer on {}: {}", device.port, e),
            }
        }
        Err(TdsConnectorError::DeviceNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_port::MockPort;

    #[test]
    fn test_parse_identification() {
        let idn = Identification::parse("TEKTRONIX,TDS 3054,0,CF:91.1CT FV:v3.27 TDS3GM:v1.00\n");

        assert_eq!(idn.manufacturer, "TEKTRONIX");
        assert_eq!(idn.model, "TDS 3054");
        assert_eq!(idn.serial_number, "0");
        assert_eq!(idn.firmware, "CF:91.1CT FV:v3.27 TDS3GM:v1.00");
    }

    #[test]
    fn test_parse_partial_identification() {
        let idn = Identification::parse("TEKTRONIX,TDS 3012");

        assert_eq!(idn.model, "TDS 3012");
        assert!(idn.serial_number.is_empty());
        assert!(idn.firmware.is_empty());
    }

    #[test]
    fn test_probe() {
        let mut terminal = TdsTerminal::new(
            MockPort::with_lines(&["TEKTRONIX,TDS 3054,0,v3.27"]),
            Duration::from_millis(20),
        );

        let idn = TdsConnector::probe(&mut terminal).unwrap();

        assert_eq!(idn.model, "TDS 3054");
        assert_eq!(terminal.get_ref().directives(), vec!["*IDN?"]);
    }

    #[test]
    fn test_probe_silent_port_times_out() {
        let mut terminal = TdsTerminal::new(MockPort::default(), Duration::from_millis(5));

        assert!(matches!(
            TdsConnector::probe(&mut terminal),
            Err(TdsTerminalError::Timeout { .. })
        ));
    }

    #[test]
    fn test_default_settings() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert!(settings.port.is_none());
    }

    #[test]
    #[ignore = "needs serial ports on the host"]
    fn test_get_available_devices() {
        let devices = TdsConnector::get_available_devices().unwrap();
        assert!(!devices.is_empty());
        for device in devices {
            assert!(!device.port.is_empty());
            assert!(!device.description.is_empty());
        }
    }
}
