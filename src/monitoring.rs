//! In this module, we implement all the monitoring logic for the sweep loop.
//! Counters are plain integers owned by the consumer. In double-buffered mode the
//! producer owns `receive_failures` and `superseded` and publishes its running
//! totals through [`ProducerCounters`] so status lines stay current.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::spectrum::RangeEstimate;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SweepStats {
    /// Sweeps fully processed
    pub sweeps: u64,
    /// Failed or short receive calls
    pub receive_failures: u64,
    /// Datagrams the transport refused
    pub send_failures: u64,
    /// Sweeps whose spectrum couldn't be encoded
    pub skipped_frames: u64,
    /// Magnitudes clamped by the encoder
    pub saturated: u64,
    /// Received frames replaced before the consumer got to them
    pub superseded: u64,
}

impl SweepStats {
    /// Take the producer-owned counters from `producer`, on top of `base`
    pub fn sync_producer(&mut self, base: &SweepStats, producer: &SweepStats) {
        self.receive_failures = base.receive_failures + producer.receive_failures;
        self.superseded = base.superseded + producer.superseded;
    }
}

/// Running totals the producer thread shares with the consumer
#[derive(Debug, Default)]
pub struct ProducerCounters {
    receive_failures: AtomicU64,
    superseded: AtomicU64,
}

impl ProducerCounters {
    pub fn publish(&self, stats: &SweepStats) {
        self.receive_failures
            .store(stats.receive_failures, Ordering::Relaxed);
        self.superseded.store(stats.superseded, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SweepStats {
        SweepStats {
            receive_failures: self.receive_failures.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

pub struct Monitor {
    pub stats: SweepStats,
    started: DateTime<Utc>,
    clock: Instant,
    interval: u64,
    last_estimate: Option<RangeEstimate>,
}

impl Monitor {
    pub fn new(interval: u64) -> Self {
        Self {
            stats: SweepStats::default(),
            started: Utc::now(),
            clock: Instant::now(),
            interval: interval.max(1),
            last_estimate: None,
        }
    }

    pub fn record_sweep(&mut self, estimate: RangeEstimate) {
        self.stats.sweeps += 1;
        self.last_estimate = Some(estimate);
        if self.stats.sweeps % self.interval == 0 {
            info!(
                sweeps = self.stats.sweeps,
                rate = self.sweep_rate(),
                peak_bin = estimate.bin,
                peak_mag = estimate.magnitude,
                receive_failures = self.stats.receive_failures,
                send_failures = self.stats.send_failures,
                superseded = self.stats.superseded,
                "Status"
            );
        }
    }

    pub fn last_estimate(&self) -> Option<RangeEstimate> {
        self.last_estimate
    }

    /// Mean sweeps per second since start
    pub fn sweep_rate(&self) -> f64 {
        let elapsed = self.clock.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.stats.sweeps as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) {
        info!(
            started = %self.started.to_rfc3339(),
            sweeps = self.stats.sweeps,
            rate = self.sweep_rate(),
            receive_failures = self.stats.receive_failures,
            send_failures = self.stats.send_failures,
            skipped_frames = self.stats.skipped_frames,
            saturated = self.stats.saturated,
            superseded = self.stats.superseded,
            "Run summary"
        );
    }
}
