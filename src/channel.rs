use crate::acquisition_config::ConfigError;
use crate::serial_terminal::nr3;
use std::fmt;
use std::str::FromStr;

/// Number of analog inputs on the largest TDS3000 models.
pub const MAX_CHANNELS: u8 = 4;

/// Label of an analog input, `"1"` to `"4"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub(crate) String);

impl ChannelId {
    pub fn new(label: &str) -> Result<Self, ConfigError> {
        let label = label.trim();
        match label.parse::<u8>() {
            Ok(n) if (1..=MAX_CHANNELS).contains(&n) => Ok(Self(n.to_string())),
            _ => Err(ConfigError::InvalidChannel {
                label: label.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header used in directives, e.g. `CH3`
    pub fn mnemonic(&self) -> String {
        format!("CH{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bandwidth {
    Full,
    OneFiftyMhz,
    TwentyMhz,
}

impl Bandwidth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bandwidth::Full => "FULl",
            Bandwidth::OneFiftyMhz => "ONEfifty",
            Bandwidth::TwentyMhz => "TWEnty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling {
    Dc,
    Ac,
    Gnd,
}

impl Coupling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Coupling::Dc => "DC",
            Coupling::Ac => "AC",
            Coupling::Gnd => "GND",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impedance {
    Meg,
    Fifty,
}

impl Impedance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impedance::Meg => "MEG",
            Impedance::Fifty => "FIFty",
        }
    }
}

/// Vertical settings of one active input.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub id: ChannelId,
    /// Vertical position in divisions above the display center line
    pub position: f64,
    pub bandwidth: Bandwidth,
    pub coupling: Coupling,
    pub impedance: Impedance,
    pub volts_per_div: f64,
}

impl Channel {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            position: 0.0,
            bandwidth: Bandwidth::Full,
            coupling: Coupling::Dc,
            impedance: Impedance::Meg,
            volts_per_div: 2.0,
        }
    }

    pub fn with_position(mut self, divisions: f64) -> Self {
        self.position = divisions;
        self
    }

    pub fn with_bandwidth(mut self, bandwidth: Bandwidth) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn with_coupling(mut self, coupling: Coupling) -> Self {
        self.coupling = coupling;
        self
    }

    pub fn with_impedance(mut self, impedance: Impedance) -> Self {
        self.impedance = impedance;
        self
    }

    pub fn with_volts_per_div(mut self, volts: f64) -> Self {
        self.volts_per_div = volts;
        self
    }

    pub fn position_directive(&self) -> String {
        format!("{}:POSITION {}", self.id.mnemonic(), nr3(self.position))
    }

    /// Bandwidth, coupling, impedance and scale, in the order they are sent
    pub fn property_directives(&self) -> [String; 4] {
        let ch = self.id.mnemonic();
        [
            format!("{}:BANdwidth {}", ch, self.bandwidth.as_str()),
            format!("{}:COUPling {}", ch, self.coupling.as_str()),
            format!("{}:IMPedance {}", ch, self.impedance.as_str()),
            format!("{}:VOLTS {}", ch, nr3(self.volts_per_div)),
        ]
    }
}
