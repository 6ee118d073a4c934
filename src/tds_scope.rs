use crate::acquisition_config::{AcquisitionConfig, ConfigError};
use crate::channel::ChannelId;
use crate::serial_terminal::{nr3, TdsTerminal, TdsTerminalError};
use crate::tds_connector::{Identification, SerialSettings, TdsConnector, TdsConnectorError};
use crate::trigger_config::TriggerConfig;
use crate::waveform::{
    decode, parse_curve, parse_float, AcquisitionResult, DecodeError, LengthMismatch, Preamble,
    RawCode,
};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

/// Directives are only honoured for the first two entries of the channel list
const POSITIONED_CHANNELS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("Timeout: no response line within {timeout:?}, received '{received}'")]
    Timeout { timeout: Duration, received: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Length mismatch: {0}")]
    LengthMismatch(#[from] LengthMismatch),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("Invalid acquisition configuration: {0}")]
    Config(#[from] ConfigError),
}

impl AcquisitionError {
    /// Transport level failures may go away when the run is repeated,
    /// protocol level ones will not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AcquisitionError::Timeout { .. } | AcquisitionError::Transport(_)
        )
    }
}

impl From<TdsTerminalError> for AcquisitionError {
    fn from(e: TdsTerminalError) -> Self {
        match e {
            TdsTerminalError::Timeout { timeout, received } => {
                AcquisitionError::Timeout { timeout, received }
            }
            TdsTerminalError::Utf8(e) => AcquisitionError::Decode(DecodeError::Utf8(e)),
            TdsTerminalError::LineTooLong { limit } => {
                AcquisitionError::Decode(DecodeError::LineTooLong { limit })
            }
            TdsTerminalError::Io(e) => AcquisitionError::Transport(e),
            TdsTerminalError::SerialPort(e) => AcquisitionError::SerialPort(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Configuring,
    SelectingChannel,
    FetchingPreamble,
    FetchingCurve,
    Decoding,
    Done,
}

/// A TDS3000 oscilloscope and the configuration of the runs made with it.
///
/// The scope owns its terminal exclusively; every directive and query is
/// issued in program order with at most one response outstanding.
pub struct TdsScope<P = Box<dyn SerialPort>> {
    serial: TdsTerminal<P>,
    config: AcquisitionConfig,
    state: AcquisitionState,
    identification: Option<Identification>,
}

impl TdsScope {
    /// Validate `config`, then open the serial link described by `settings`
    pub fn connect(
        settings: &SerialSettings,
        config: AcquisitionConfig,
    ) -> Result<Self, TdsConnectorError> {
        // Checked before touching the port, so a bad config never opens or probes one
        config.validate()?;
        let serial = TdsConnector::connect(settings)?;
        Ok(Self::new(serial, config)?)
    }
}

impl<P: Read + Write> TdsScope<P> {
    pub fn new(serial: TdsTerminal<P>, config: AcquisitionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            serial,
            config,
            state: AcquisitionState::Idle,
            identification: None,
        })
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Identification read during the last configuration, if any
    pub fn identification(&self) -> Option<&Identification> {
        self.identification.as_ref()
    }

    /// Hand back the terminal, closing the scope
    pub fn close(self) -> TdsTerminal<P> {
        self.serial
    }

    fn transition(&mut self, next: AcquisitionState) {
        log::debug!("Acquisition state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Send `*IDN?` and read the answer after the identify delay
    pub fn identify(&mut self) -> Result<Identification, AcquisitionError> {
        self.serial.write_directive("*IDN?")?;
        thread::sleep(self.config.identify_delay);
        let response = self.serial.read_line()?;

        let identification = Identification::parse(&response);
        log::info!("Connected to {}", identification);
        Ok(identification)
    }

    /// Configuration directives in the order they are sent
    pub fn configuration_directives(&self) -> Vec<String> {
        let config = &self.config;
        let mut directives = vec![
            format!("ACQuire:MODe {}", config.acquire_mode.as_str()),
            format!("HORizontal:RESOlution {}", config.resolution.as_str()),
            format!("HORizontal:MAIn:SCAle {}", nr3(config.horizontal_scale)),
        ];

        directives.extend(config.trigger.clone().into_trigger_directives().into_vec());

        directives.extend(
            config
                .channels
                .iter()
                .take(POSITIONED_CHANNELS)
                .map(|channel| channel.position_directive()),
        );

        for channel in &config.channels {
            directives.extend(channel.property_directives());
        }

        directives
    }

    /// Identify the instrument, then set acquisition, timebase, trigger and vertical settings.
    ///
    /// A write error aborts the configuration; nothing already sent is undone.
    pub fn configure(&mut self) -> Result<Identification, AcquisitionError> {
        self.transition(AcquisitionState::Configuring);

        let identification = self.identify()?;
        self.identification = Some(identification.clone());

        for directive in self.configuration_directives() {
            self.serial.write_directive(&directive)?;
        }
        Ok(identification)
    }

    /// Make `channel` the data source of the following preamble and curve queries
    pub fn select_source(&mut self, channel: &ChannelId) -> Result<(), AcquisitionError> {
        self.transition(AcquisitionState::SelectingChannel);

        let window = self.config.record_window;
        self.serial
            .write_directive(&format!("DATa:SOUrce {}", channel.mnemonic()))?;
        self.serial.write_directive("DATa:ENCDG ASCIi")?;
        self.serial.write_directive("DATA:WIDth 1")?;
        self.serial
            .write_directive(&format!("DATA:START {}", window.start()))?;
        self.serial
            .write_directive(&format!("DATA:STOP {}", window.stop()))?;

        thread::sleep(self.config.settle_delay);
        Ok(())
    }

    fn query_float(&mut self, directive: &str) -> Result<f64, AcquisitionError> {
        let response = self.serial.query(directive)?;
        Ok(parse_float(directive, &response)?)
    }

    /// Read the scaling constants of the selected source
    pub fn fetch_preamble(&mut self) -> Result<Preamble, AcquisitionError> {
        self.transition(AcquisitionState::FetchingPreamble);

        let zero_reference = self.query_float("WFMPre:YZEro?")?;
        let multiplier = self.query_float("WFMPre:YMUlt?")?;
        let digital_offset = self.query_float("WFMPre:YOFf?")?;

        let preamble = Preamble::new(zero_reference, multiplier, digital_offset);
        log::debug!("Preamble: {:?}", preamble);
        Ok(preamble)
    }

    /// Read the raw codes of the selected source
    pub fn fetch_curve(&mut self) -> Result<Vec<RawCode>, AcquisitionError> {
        self.transition(AcquisitionState::FetchingCurve);

        let response = self.serial.query("CURVe?")?;
        let codes = parse_curve(&response)?;
        log::debug!("Received {} points", codes.len());
        Ok(codes)
    }

    /// Select, fetch and decode one channel
    pub fn acquire_channel(&mut self, channel: &ChannelId) -> Result<Vec<f64>, AcquisitionError> {
        let span = tracing::debug_span!("acquire_channel", channel = %channel);
        let _enter = span.enter();

        self.select_source(channel)?;
        let preamble = self.fetch_preamble()?;
        let codes = self.fetch_curve()?;

        self.transition(AcquisitionState::Decoding);
        Ok(decode(&preamble, &codes))
    }

    /// Configure the instrument and acquire every active channel in order.
    ///
    /// The first failure aborts the whole run; no partial result is returned.
    pub fn acquire(&mut self) -> Result<AcquisitionResult, AcquisitionError> {
        self.transition(AcquisitionState::Idle);
        self.configure()?;

        let ids: Vec<ChannelId> = self.config.channel_ids().cloned().collect();
        let mut channels = Vec::with_capacity(ids.len());
        for id in ids {
            let samples = self.acquire_channel(&id)?;
            log::info!("Acquired {} samples from {}", samples.len(), id);
            channels.push((id, samples));
        }

        let result = AcquisitionResult::from_channels(channels)?;
        self.transition(AcquisitionState::Done);
        Ok(result)
    }
}
