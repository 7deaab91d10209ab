use std::{
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use clap::Parser;
use fmcw_radar::{
    acquisition::Session,
    args::{convert_filter, Args, Source},
    config::RadarConfig,
    error::{RadarError, RadarResult},
    frontend::{FrontEnd, ReplayFrontEnd, SimulatedFrontEnd},
    telemetry::UdpTransport,
};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .init();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> RadarResult<()> {
    let mut config = RadarConfig {
        report_interval: args.report_interval,
        ..Default::default()
    };
    if let Some(dest) = args.dest {
        config.destination = dest;
    }
    // The one and only check of the destination, before anything is opened
    config.validate()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let pace = Duration::from_secs_f32(config.sweep_period());
    match args.source {
        Source::Sim => {
            let fe = SimulatedFrontEnd::new(config.fft_size)
                .with_delay(args.target_delay)
                .with_noise(args.noise, 0)
                .with_pace(pace);
            drive(config, fe, &running, args.double_buffer)
        }
        Source::Replay => {
            let path = args.recording.ok_or_else(|| {
                RadarError::InvalidConfig("replay needs a recording".to_owned())
            })?;
            let fe = ReplayFrontEnd::open(&path, config.fft_size)?.with_pace(pace);
            info!(path = %path.display(), "Replaying recorded sweeps");
            drive(config, fe, &running, args.double_buffer)
        }
    }
}

fn drive<F: FrontEnd + Send>(
    config: RadarConfig,
    front_end: F,
    running: &AtomicBool,
    double_buffer: bool,
) -> RadarResult<()> {
    let transport = UdpTransport::open(config.destination)?;
    info!(destination = %transport.destination(), "Streaming spectra");
    let mut session = Session::open(config, front_end, transport)?;
    if double_buffer {
        session.run_double_buffered(running)
    } else {
        session.run(running)
    }
}
