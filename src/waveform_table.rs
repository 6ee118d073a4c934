use crate::acquisition_config::AcquisitionConfig;
use crate::channel::ChannelId;
use crate::waveform::AcquisitionResult;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const TIME_COLUMN_NAME: &str = "Time[s]";

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build or write the table: {0}")]
    Polars(#[from] PolarsError),
}

/// Time of each transferred record point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    /// Time of the first transferred point, relative to the start of the record
    pub start: f64,
    pub sample_interval: f64,
}

impl TimeAxis {
    pub fn new(start: f64, sample_interval: f64) -> Self {
        Self {
            start,
            sample_interval,
        }
    }

    /// Derive the axis from the timebase and record window of a run
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        let sample_interval = config.sample_interval();
        let first_index = f64::from(config.record_window.start() - 1);
        Self::new(first_index * sample_interval, sample_interval)
    }

    pub fn values(&self, samples: usize) -> Vec<f64> {
        (0..samples)
            .map(|i| self.start + i as f64 * self.sample_interval)
            .collect()
    }
}

/// Tab separated table of an acquisition: a time column followed by one
/// voltage column per channel, in channel order.
pub struct WaveformTable {
    df: DataFrame,
}

impl WaveformTable {
    pub fn voltage_column_name(channel: &ChannelId) -> String {
        format!("{} Voltage[V]", channel)
    }

    pub fn from_result(result: &AcquisitionResult, axis: &TimeAxis) -> Result<Self, OutputError> {
        let mut columns: Vec<Column> = Vec::with_capacity(result.num_channels() + 1);
        columns.push(
            Series::new(
                TIME_COLUMN_NAME.into(),
                axis.values(result.samples_per_channel()),
            )
            .into(),
        );

        for (channel, samples) in result.iter() {
            columns.push(Series::new(Self::voltage_column_name(channel).into(), samples).into());
        }

        Ok(Self {
            df: DataFrame::new(columns)?,
        })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }

    pub fn write_tsv<W: Write>(&mut self, writer: W) -> Result<(), OutputError> {
        CsvWriter::new(writer)
            .include_header(true)
            .with_separator(b'\t')
            .finish(&mut self.df)?;
        Ok(())
    }

    /// Write the table to `path`.
    ///
    /// The data goes to a sibling temporary file first which is renamed into
    /// place, so `path` never holds a partial table.
    pub fn save(&mut self, path: &Path) -> Result<(), OutputError> {
        let tmp_path = temporary_path(path);

        let written = File::create(&tmp_path)
            .map_err(OutputError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                self.write_tsv(&mut writer)?;
                writer.flush()?;
                Ok(())
            })
            .and_then(|()| fs::rename(&tmp_path, path).map_err(OutputError::from));

        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        } else {
            log::info!("Wrote {} rows to {}", self.df.height(), path.display());
        }
        written
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition_config::RecordWindow;

    fn id(label: &str) -> ChannelId {
        ChannelId::new(label).unwrap()
    }

    fn result() -> AcquisitionResult {
        AcquisitionResult::from_channels(vec![
            (id("1"), vec![0.0, 0.16, -0.16]),
            (id("3"), vec![0.1, 0.2, 0.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_time_axis_from_config() {
        let config = AcquisitionConfig::default()
            .with_horizontal_scale(1e-3)
            .with_record_window(RecordWindow::new(11, 20).unwrap());
        let axis = TimeAxis::from_config(&config);

        // 1 ms/div over 10 divisions and 10000 points
        assert!((axis.sample_interval - 1e-6).abs() < 1e-15);
        assert!((axis.start - 10e-6).abs() < 1e-15);

        let values = axis.values(3);
        assert_eq!(values.len(), 3);
        assert!((values[2] - 12e-6).abs() < 1e-15);
    }

    #[test]
    fn test_table_columns() {
        let table = WaveformTable::from_result(&result(), &TimeAxis::new(0.0, 0.5)).unwrap();
        let df = table.dataframe();

        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Time[s]", "CH1 Voltage[V]", "CH3 Voltage[V]"]);
        assert_eq!(df.height(), 3);

        let time: Vec<f64> = df
            .column(TIME_COLUMN_NAME)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(time, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_write_tsv() {
        let mut table = WaveformTable::from_result(&result(), &TimeAxis::new(0.0, 1.0)).unwrap();
        let mut buffer = Vec::new();
        table.write_tsv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Time[s]\tCH1 Voltage[V]\tCH3 Voltage[V]"));
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn test_save_replaces_file() {
        let path = std::env::temp_dir().join(format!("tdscope-table-{}.txt", std::process::id()));
        let mut table = WaveformTable::from_result(&result(), &TimeAxis::new(0.0, 1.0)).unwrap();

        table.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Time[s]\t"));
        assert!(!temporary_path(&path).exists());
        fs::remove_file(&path).unwrap();
    }
}
