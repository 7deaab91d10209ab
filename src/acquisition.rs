//! This module contains all the acquisition logic.
//!
//! The chirp goes out once at startup and the radio repeats it on its own. After
//! that every sweep is a blocking receive followed by demodulation, analysis and a
//! best-effort telemetry send, in that order.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info, trace, warn};

use crate::{
    config::{RadarConfig, RetryPolicy},
    error::{RadarError, RadarResult},
    frontend::{bring_up, Endpoint, FrontEnd},
    monitoring::{Monitor, ProducerCounters, SweepStats},
    pipeline::SweepProcessor,
    spectrum::RangeEstimate,
    telemetry::Transport,
};

/// Receive one frame of `expected` interleaved values and hand it to `consume`.
///
/// Failed and short receives are retried with backoff. Once `policy` runs out of
/// patience the radios are considered out of sync and the error is fatal.
pub fn acquire<F, R>(
    front_end: &mut F,
    expected: usize,
    policy: &RetryPolicy,
    stats: &mut SweepStats,
    mut consume: impl FnMut(&[i16]) -> R,
) -> RadarResult<R>
where
    F: FrontEnd + ?Sized,
{
    let mut failures = 0u32;
    loop {
        let err = match front_end.receive(Endpoint::Master) {
            Ok(frame) if frame.len() == expected => return Ok(consume(frame)),
            Ok(frame) => RadarError::ShortFrame {
                expected,
                actual: frame.len(),
            },
            Err(e) => e,
        };
        if !err.is_recoverable() {
            return Err(err);
        }
        failures += 1;
        stats.receive_failures += 1;
        if failures >= policy.max_consecutive_failures.max(1) {
            return Err(RadarError::LostSync { failures });
        }
        let backoff = policy.backoff(failures);
        warn!(error = %err, failures, ?backoff, "Receive failed, retrying");
        thread::sleep(backoff);
    }
}

/// Best-effort: a dropped datagram is superseded by the next sweep
fn publish<T: Transport + ?Sized>(
    processor: &mut SweepProcessor,
    transport: &mut T,
    monitor: &mut Monitor,
    estimate: RangeEstimate,
) {
    trace!(bin = estimate.bin, magnitude = estimate.magnitude, "Range");
    match processor.encode() {
        Ok(frame) => {
            monitor.stats.saturated += frame.saturated as u64;
            match transport.send(frame.bytes) {
                Ok(sent) if sent == frame.bytes.len() => {}
                Ok(sent) => {
                    monitor.stats.send_failures += 1;
                    trace!(sent, len = frame.bytes.len(), "Telemetry truncated");
                }
                Err(e) => {
                    monitor.stats.send_failures += 1;
                    trace!(error = %e, "Telemetry dropped");
                }
            }
        }
        Err(e) => {
            monitor.stats.skipped_frames += 1;
            warn!(error = %e, "Skipping telemetry for this sweep");
        }
    }
    monitor.record_sweep(estimate);
}

/// Hand a frame to the consumer without ever waiting on it.
/// A frame still sitting in the slot is stale and gets replaced.
fn handoff(
    tx: &Sender<Vec<i16>>,
    drain: &Receiver<Vec<i16>>,
    frame: Vec<i16>,
    stats: &mut SweepStats,
) {
    match tx.try_send(frame) {
        Ok(()) => {}
        Err(TrySendError::Full(frame)) => {
            if drain.try_recv().is_ok() {
                stats.superseded += 1;
            }
            // We're the only producer, so the slot is free now
            let _ = tx.try_send(frame);
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// Owns the radios and the telemetry socket for the lifetime of a run.
/// Both are released when the session drops, on every exit path.
pub struct Session<F: FrontEnd, T: Transport> {
    config: RadarConfig,
    front_end: F,
    transport: T,
    processor: SweepProcessor,
    monitor: Monitor,
}

impl<F: FrontEnd, T: Transport> Session<F, T> {
    /// Validate, bring up the radios and push the reference chirp exactly once
    pub fn open(config: RadarConfig, mut front_end: F, transport: T) -> RadarResult<Self> {
        config.validate()?;
        let processor = SweepProcessor::new(&config)?;
        bring_up(&mut front_end, config.carrier_hz)?;
        let tx = processor.reference().to_tx_buffer(config.tx_scale);
        front_end.transmit(Endpoint::Slave, &tx)?;
        info!(
            fs = config.sample_rate,
            bw = config.bandwidth,
            n = config.fft_size,
            "Reference chirp transmitted"
        );
        let monitor = Monitor::new(config.report_interval);
        Ok(Self {
            config,
            front_end,
            transport,
            processor,
            monitor,
        })
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub fn stats(&self) -> &SweepStats {
        &self.monitor.stats
    }

    pub fn last_estimate(&self) -> Option<RangeEstimate> {
        self.monitor.last_estimate()
    }

    /// receive -> demodulate -> analyze -> encode -> send
    pub fn run_sweep(&mut self) -> RadarResult<RangeEstimate> {
        let Self {
            config,
            front_end,
            transport,
            processor,
            monitor,
        } = self;
        let estimate = acquire(
            front_end,
            2 * config.fft_size,
            &config.retry,
            &mut monitor.stats,
            |frame| processor.process(frame),
        )?;
        publish(processor, transport, monitor, estimate);
        Ok(estimate)
    }

    /// Sweep until `running` is cleared or a fatal error
    pub fn run(&mut self, running: &AtomicBool) -> RadarResult<()> {
        info!("FMCW radar online, starting processing");
        while running.load(Ordering::Relaxed) {
            self.run_sweep()?;
        }
        Ok(())
    }

    /// Overlap the next receive with processing of the current sweep.
    ///
    /// A producer thread owns the front-end and pushes owned copies of each frame
    /// through a single slot. The consumer always gets the latest sweep, anything
    /// it was too slow for is dropped.
    pub fn run_double_buffered(&mut self, running: &AtomicBool) -> RadarResult<()>
    where
        F: Send,
    {
        let Self {
            config,
            front_end,
            transport,
            processor,
            monitor,
        } = self;
        let expected = 2 * config.fft_size;
        let retry = config.retry;
        let (tx, rx) = bounded::<Vec<i16>>(1);
        let drain = rx.clone();
        let counters = ProducerCounters::default();
        let base = monitor.stats.clone();
        info!("FMCW radar online, starting double-buffered processing");
        thread::scope(|s| -> RadarResult<()> {
            let shared = &counters;
            let producer = s.spawn(move || {
                let mut stats = SweepStats::default();
                let mut result = Ok(());
                while running.load(Ordering::Relaxed) {
                    let received =
                        acquire(front_end, expected, &retry, &mut stats, |f| f.to_vec());
                    match received {
                        Ok(frame) => handoff(&tx, &drain, frame, &mut stats),
                        Err(e) => result = Err(e),
                    }
                    shared.publish(&stats);
                    if result.is_err() {
                        break;
                    }
                }
                // Dropping the sender lets the consumer finish
                drop(tx);
                debug!("Producer stopped");
                result
            });
            for frame in rx.iter() {
                monitor.stats.sync_producer(&base, &counters.snapshot());
                let estimate = processor.process(&frame);
                publish(processor, transport, monitor, estimate);
            }
            let result = producer
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            // Final totals land on every exit path, fatal ones included
            monitor.stats.sync_producer(&base, &counters.snapshot());
            result
        })
    }
}

impl<F: FrontEnd, T: Transport> Drop for Session<F, T> {
    fn drop(&mut self) {
        self.monitor.summary();
        info!("Session closed, radios and telemetry released");
    }
}
