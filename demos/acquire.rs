// Waveform acquisition example
//
// Connects to a TDS3000 oscilloscope, configures it, acquires the active
// channels and writes the voltages to a tab separated table.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tdscope_rs::{
    AcquisitionConfig, Channel, ChannelId, EdgeTrigger, RecordWindow, SerialSettings, TdsScope,
    TimeAxis, WaveformTable,
};

#[derive(Parser)]
#[command(name = "acquire")]
#[command(version = "0.1")]
#[command(about = "Acquire waveforms from a TDS3000 oscilloscope")]
struct Args {
    /// Serial port of the oscilloscope. Probes all ports when omitted.
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// Read timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Active channels, in output column order
    #[arg(short, long, value_delimiter = ',', default_value = "1,3")]
    channels: Vec<ChannelId>,

    /// Horizontal scale in seconds per division
    #[arg(long, default_value_t = 40e-6)]
    scale: f64,

    /// Trigger level in volts, falling edge on the last channel
    #[arg(long, default_value_t = 1.5)]
    trigger_level: f64,

    /// Last record point to transfer
    #[arg(long, default_value_t = 100)]
    points: u32,

    /// Output table
    #[arg(short, long, default_value = "data.txt")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let channels: Vec<Channel> = args
        .channels
        .iter()
        .enumerate()
        .map(|(i, id)| Channel::new(id.clone()).with_position(2.0 * i as f64))
        .collect();
    let trigger_source = args
        .channels
        .last()
        .cloned()
        .ok_or("At least one channel is required")?;

    let config = AcquisitionConfig::default()
        .with_channels(channels)
        .with_horizontal_scale(args.scale)
        .with_trigger(EdgeTrigger::start_capturing_when(trigger_source, args.trigger_level).falling_edge())
        .with_record_window(RecordWindow::new(1, args.points)?);

    let settings = SerialSettings {
        port: args.port,
        baud_rate: args.baud,
        timeout: Duration::from_secs(args.timeout),
    };

    let mut scope = TdsScope::connect(&settings, config)?;
    let result = scope.acquire()?;

    println!(
        "Captured {} samples on {} channel(s)",
        result.samples_per_channel(),
        result.num_channels()
    );
    for (channel, samples) in result.iter() {
        let min = samples.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = samples.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        println!("  {}: {:.3}V to {:.3}V", channel, min, max);
    }

    let axis = TimeAxis::from_config(scope.config());
    WaveformTable::from_result(&result, &axis)?.save(&args.output)?;
    println!("Saved to {}", args.output.display());

    scope.close();
    Ok(())
}
