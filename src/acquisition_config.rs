use crate::channel::{Channel, ChannelId};
use crate::trigger_config::EdgeTrigger;
use std::collections::HashSet;
use std::time::Duration;

/// Horizontal divisions across the TDS3000 display.
pub const HORIZONTAL_DIVISIONS: f64 = 10.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid channel label '{label}', expected 1 to 4")]
    InvalidChannel { label: String },

    #[error("No active channels configured")]
    NoChannels,

    #[error("Channel {0} is configured more than once")]
    DuplicateChannel(ChannelId),

    #[error("Invalid record window {start}..={stop}, indices start at 1 and stop must not precede start")]
    InvalidRecordWindow { start: u32, stop: u32 },

    #[error("Record window stop {stop} exceeds the record length of {record_length} points")]
    RecordWindowTooLong { stop: u32, record_length: u32 },

    #[error("Invalid {name}: {value}, must be finite and positive")]
    InvalidValue { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    Sample,
    PeakDetect,
    Average,
    Envelope,
}

impl AcquireMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquireMode::Sample => "SAMple",
            AcquireMode::PeakDetect => "PEAKdetect",
            AcquireMode::Average => "AVErage",
            AcquireMode::Envelope => "ENVelope",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 10000 point records
    High,
    /// 500 point records
    Low,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::High => "HIGH",
            Resolution::Low => "LOW",
        }
    }

    pub fn record_length(&self) -> u32 {
        match self {
            Resolution::High => 10_000,
            Resolution::Low => 500,
        }
    }
}

/// Inclusive, 1-based window of record points transferred by a curve query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordWindow {
    start: u32,
    stop: u32,
}

impl RecordWindow {
    pub fn new(start: u32, stop: u32) -> Result<Self, ConfigError> {
        if start == 0 || stop < start {
            return Err(ConfigError::InvalidRecordWindow { start, stop });
        }
        Ok(Self { start, stop })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn stop(&self) -> u32 {
        self.stop
    }

    /// Number of points the instrument sends at most
    pub fn len(&self) -> usize {
        (self.stop - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for RecordWindow {
    fn default() -> Self {
        Self { start: 1, stop: 100 }
    }
}

/// Everything one acquisition run needs, fixed for the duration of the run.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Active inputs. Order determines output column order.
    pub channels: Vec<Channel>,
    pub acquire_mode: AcquireMode,
    pub resolution: Resolution,
    /// Seconds per horizontal division
    pub horizontal_scale: f64,
    pub trigger: EdgeTrigger,
    pub record_window: RecordWindow,
    /// Pause after selecting a data source so the instrument registers it
    pub settle_delay: Duration,
    /// Pause between the identification query and reading its answer
    pub identify_delay: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        let ch1 = ChannelId("1".to_string());
        let ch3 = ChannelId("3".to_string());
        Self {
            channels: vec![
                Channel::new(ch1).with_position(0.0),
                Channel::new(ch3.clone()).with_position(2.0),
            ],
            acquire_mode: AcquireMode::Sample,
            resolution: Resolution::High,
            horizontal_scale: 40e-6,
            trigger: EdgeTrigger::start_capturing_when(ch3, 1.5).falling_edge(),
            record_window: RecordWindow::default(),
            settle_delay: Duration::from_millis(100),
            identify_delay: Duration::from_millis(500),
        }
    }
}

impl AcquisitionConfig {
    pub fn with_channels(mut self, channels: Vec<Channel>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_acquire_mode(mut self, mode: AcquireMode) -> Self {
        self.acquire_mode = mode;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_horizontal_scale(mut self, seconds_per_div: f64) -> Self {
        self.horizontal_scale = seconds_per_div;
        self
    }

    pub fn with_trigger(mut self, trigger: EdgeTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_record_window(mut self, window: RecordWindow) -> Self {
        self.record_window = window;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_identify_delay(mut self, delay: Duration) -> Self {
        self.identify_delay = delay;
        self
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter().map(|channel| &channel.id)
    }

    /// Time between two record points for the configured timebase
    pub fn sample_interval(&self) -> f64 {
        HORIZONTAL_DIVISIONS * self.horizontal_scale / f64::from(self.resolution.record_length())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(&channel.id) {
                return Err(ConfigError::DuplicateChannel(channel.id.clone()));
            }
            check_positive("volts per division", channel.volts_per_div)?;
            if !channel.position.is_finite() {
                return Err(ConfigError::InvalidValue {
                    name: "channel position",
                    value: channel.position,
                });
            }
        }

        check_positive("horizontal scale", self.horizontal_scale)?;
        if !self.trigger.level.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "trigger level",
                value: self.trigger.level,
            });
        }

        let window = RecordWindow::new(self.record_window.start, self.record_window.stop)?;
        let record_length = self.resolution.record_length();
        if window.stop > record_length {
            return Err(ConfigError::RecordWindowTooLong {
                stop: window.stop,
                record_length,
            });
        }

        Ok(())
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { name, value })
    }
}
