//! Argument parsing for running from the command line

use std::{net::SocketAddr, path::PathBuf};

use clap::{ArgEnum, Parser};

#[derive(ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Software loopback with a synthetic target
    Sim,
    /// Sweeps recorded to a file
    Replay,
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Where sweeps come from
    #[clap(short, long, arg_enum, value_parser, default_value_t = Source::Sim)]
    pub source: Source,
    /// Recording of interleaved native-endian i16 I/Q (replay source only)
    #[clap(short, long, required_if_eq("source", "replay"))]
    pub recording: Option<PathBuf>,
    /// Telemetry destination, overrides the deployed display address
    #[clap(short, long)]
    pub dest: Option<SocketAddr>,
    /// Round trip delay of the simulated target in samples
    #[clap(long, default_value_t = 32)]
    pub target_delay: usize,
    /// Amplitude of the simulated receiver noise in ADC counts
    #[clap(long, default_value_t = 20.0)]
    pub noise: f32,
    /// Overlap receive with processing, always keeping the latest sweep
    #[clap(short = 'b', long)]
    pub double_buffer: bool,
    /// Sweeps between status reports
    #[clap(long, default_value_t = 1000)]
    #[clap(value_parser = clap::value_parser!(u64).range(1..))]
    pub report_interval: u64,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}
