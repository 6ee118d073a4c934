use crate::channel::ChannelId;
use crate::serial_terminal::nr3;

pub trait TriggerConfig {
    fn into_trigger_directives(self) -> TriggerDirectives;
}

/// Trigger setup rendered as directives, in the order they must be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDirectives {
    directives: Vec<String>,
}

impl TriggerDirectives {
    pub fn into_vec(self) -> Vec<String> {
        self.directives
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSlope {
    Rising,
    Falling,
}

impl EdgeSlope {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeSlope::Rising => "RISe",
            EdgeSlope::Falling => "FALL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCoupling {
    Dc,
    Ac,
    HfReject,
    LfReject,
    NoiseReject,
}

impl TriggerCoupling {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerCoupling::Dc => "DC",
            TriggerCoupling::Ac => "AC",
            TriggerCoupling::HfReject => "HFRej",
            TriggerCoupling::LfReject => "LFRej",
            TriggerCoupling::NoiseReject => "NOISErej",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Free-runs when no trigger event occurs
    Auto,
    /// Only acquires on a valid trigger event
    Normal,
}

impl TriggerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerMode::Auto => "AUTO",
            TriggerMode::Normal => "NORMal",
        }
    }
}

#[derive(Debug)]
pub struct EdgeTriggerBuilder {
    source: ChannelId,
    volts: f64,
    coupling: TriggerCoupling,
    mode: TriggerMode,
}

impl EdgeTriggerBuilder {
    pub fn coupling(mut self, coupling: TriggerCoupling) -> Self {
        self.coupling = coupling;
        self
    }

    pub fn mode(mut self, mode: TriggerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn rising_edge(self) -> EdgeTrigger {
        self.into_trigger(EdgeSlope::Rising)
    }

    pub fn falling_edge(self) -> EdgeTrigger {
        self.into_trigger(EdgeSlope::Falling)
    }

    fn into_trigger(self, slope: EdgeSlope) -> EdgeTrigger {
        EdgeTrigger {
            source: self.source,
            level: self.volts,
            slope,
            coupling: self.coupling,
            mode: self.mode,
        }
    }
}

/// Main (A) trigger on an edge of one input.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTrigger {
    pub source: ChannelId,
    pub level: f64,
    pub slope: EdgeSlope,
    pub coupling: TriggerCoupling,
    pub mode: TriggerMode,
}

impl EdgeTrigger {
    /// Start a trigger on `source` crossing `volts`. Defaults to DC coupling in normal mode.
    pub fn start_capturing_when(source: ChannelId, volts: f64) -> EdgeTriggerBuilder {
        EdgeTriggerBuilder {
            source,
            volts,
            coupling: TriggerCoupling::Dc,
            mode: TriggerMode::Normal,
        }
    }
}

impl TriggerConfig for EdgeTrigger {
    fn into_trigger_directives(self) -> TriggerDirectives {
        TriggerDirectives {
            directives: vec![
                format!("TRIGger:A:PULse:SOUrce {}", self.source.mnemonic()),
                "TRIGger:A:TYPe EDGe".to_string(),
                format!("TRIGGER:A:EDGE:COUPLING {}", self.coupling.as_str()),
                format!("TRIGGER:A:EDGE:SLOPE {}", self.slope.as_str()),
                format!("TRIGGER:A:LEVEL {}", nr3(self.level)),
                format!("TRIGGER:A:MODE {}", self.mode.as_str()),
            ],
        }
    }
}
