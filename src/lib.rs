//! # TDScope RS
//!
//! A Rust library for acquiring waveforms from Tektronix TDS3000 series oscilloscopes
//! over their RS-232 interface.
//!
//! The instrument speaks a line based text protocol: every directive ends with a
//! newline and every query is answered by exactly one newline terminated line.
//! This crate configures acquisition, timebase, trigger and vertical settings,
//! then reads the scaling preamble and the ASCII curve of each active channel and
//! converts the raw codes to volts.
//!
//! ## Features
//!
//! - **Serial transport**: Uses `serialport`, with port discovery via `*IDN?` probing
//! - **Ordered configuration**: Acquisition, timebase, trigger and per-channel settings
//! - **Trigger configuration**: Edge trigger with a builder pattern
//! - **Waveform decoding**: `voltage = YZEro + YMUlt * (code - YOFf)` per point
//! - **Table output**: Uses `polars` to write a tab separated table with a time axis
//! - **Type safety**: One error enum per layer, no partial results on failure
//!
//! ## Examples
//!
//! ### Acquiring two channels
//!
//! ```rust,no_run
//! use tdscope_rs::{AcquisitionConfig, SerialSettings, TdsScope, TimeAxis, WaveformTable};
//! use std::path::Path;
//!
//! let settings = SerialSettings {
//!     port: Some("/dev/ttyUSB0".to_string()),
//!     ..SerialSettings::default()
//! };
//! let mut scope = TdsScope::connect(&settings, AcquisitionConfig::default())?;
//!
//! let result = scope.acquire()?;
//! println!("Captured {} samples per channel", result.samples_per_channel());
//!
//! let axis = TimeAxis::from_config(scope.config());
//! WaveformTable::from_result(&result, &axis)?.save(Path::new("data.txt"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Edge Trigger
//!
//! ```rust
//! use tdscope_rs::{ChannelId, EdgeTrigger, TriggerConfig, TriggerCoupling};
//!
//! let trigger = EdgeTrigger::start_capturing_when(ChannelId::new("3")?, 1.5)
//!     .coupling(TriggerCoupling::Dc)
//!     .falling_edge();
//!
//! for directive in trigger.into_trigger_directives().iter() {
//!     println!("{}", directive);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Decoding
//!
//! ```rust
//! use tdscope_rs::waveform::{decode, parse_curve, Preamble};
//!
//! let codes = parse_curve("130,125,127\n")?;
//! let volts = decode(&Preamble::new(0.0, 0.04, 127.0), &codes);
//! assert_eq!(volts.len(), 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Opens a Tracy zone for the rest of the enclosing block when the
/// `cpu-profiling` feature is enabled and a Tracy client is running.
macro_rules! profile_zone {
    ($name:literal) => {
        #[cfg(feature = "cpu-profiling")]
        let _zone = tracy_client::Client::running()
            .map(|client| client.span(tracy_client::span_location!($name), 0));
    };
}

pub mod acquisition_config;
pub mod channel;
pub mod serial_terminal;
pub mod tds_connector;
pub mod tds_scope;
pub mod trigger_config;
pub mod waveform;
pub mod waveform_table;

#[cfg(test)]
mod mock_port;

// Re-export the main types for convenience
pub use acquisition_config::{AcquireMode, AcquisitionConfig, ConfigError, RecordWindow, Resolution};

pub use channel::{Bandwidth, Channel, ChannelId, Coupling, Impedance};

pub use trigger_config::{
    EdgeSlope, EdgeTrigger, EdgeTriggerBuilder, TriggerConfig, TriggerCoupling, TriggerMode,
};

pub use serial_terminal::{TdsTerminal, TdsTerminalError};

pub use tds_connector::{Identification, SerialSettings, TdsConnector, TdsConnectorError, TdsDevice};

pub use tds_scope::{AcquisitionError, AcquisitionState, TdsScope};

pub use waveform::{AcquisitionResult, DecodeError, LengthMismatch, Preamble, RawCode};

pub use waveform_table::{OutputError, TimeAxis, WaveformTable};
