//! Operating parameters, fixed per deployment

use std::{net::SocketAddr, time::Duration};

use crate::{
    error::{RadarError, RadarResult},
    telemetry::{max_frame_len, MAX_INTEGER_DIGITS},
};

// Deployed radar
pub const SAMPLE_RATE: f32 = 5_000_000.0;
pub const SWEEP_BANDWIDTH: f32 = 2_000_000.0;
pub const FFT_SIZE: usize = 256;
pub const CARRIER_HZ: u64 = 5_800_000_000;
// Keep the DAC well inside its range
pub const TX_SCALE: f32 = 2000.0;
// The display laptop
pub const DESTINATION_IP: [u8; 4] = [192, 168, 2, 10];
pub const DESTINATION_PORT: u16 = 5005;
// One unfragmented datagram on a 1500 byte MTU (minus IPv4 and UDP headers)
pub const MAX_DATAGRAM_PAYLOAD: usize = 1472;

/// Bounded exponential backoff for the per-sweep receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures tolerated before declaring lost sync
    pub max_consecutive_failures: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait after the `failures`-th consecutive failure (1-based)
    pub fn backoff(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarConfig {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Swept bandwidth of the chirp in Hz
    pub bandwidth: f32,
    /// Samples per sweep, also the FFT size
    pub fft_size: usize,
    /// LO frequency for both radios
    pub carrier_hz: u64,
    /// Fixed point scale for the transmit buffer
    pub tx_scale: f32,
    pub destination: SocketAddr,
    pub max_payload: usize,
    pub retry: RetryPolicy,
    /// Sweeps between status reports
    pub report_interval: u64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            bandwidth: SWEEP_BANDWIDTH,
            fft_size: FFT_SIZE,
            carrier_hz: CARRIER_HZ,
            tx_scale: TX_SCALE,
            destination: SocketAddr::from((DESTINATION_IP, DESTINATION_PORT)),
            max_payload: MAX_DATAGRAM_PAYLOAD,
            retry: RetryPolicy::default(),
            report_interval: 1000,
        }
    }
}

impl RadarConfig {
    /// Sweep duration in seconds
    pub fn sweep_period(&self) -> f32 {
        self.fft_size as f32 / self.sample_rate
    }

    /// Number of bins that go out over telemetry
    pub fn telemetry_bins(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> RadarResult<()> {
        if self.fft_size < 4 || !self.fft_size.is_power_of_two() {
            return Err(RadarError::InvalidConfig(format!(
                "FFT size {} is not a power of two >= 4",
                self.fft_size
            )));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(RadarError::InvalidConfig(format!(
                "sample rate {} Hz must be positive",
                self.sample_rate
            )));
        }
        if !(self.bandwidth.is_finite() && self.bandwidth > 0.0) {
            return Err(RadarError::InvalidConfig(format!(
                "bandwidth {} Hz must be positive",
                self.bandwidth
            )));
        }
        if self.bandwidth > self.sample_rate {
            return Err(RadarError::InvalidConfig(format!(
                "bandwidth {} Hz exceeds sample rate {} Hz",
                self.bandwidth, self.sample_rate
            )));
        }
        if !(self.tx_scale > 0.0 && self.tx_scale <= i16::MAX as f32) {
            return Err(RadarError::InvalidConfig(format!(
                "transmit scale {} does not fit 16-bit samples",
                self.tx_scale
            )));
        }
        if self.destination.port() == 0 || self.destination.ip().is_unspecified() {
            return Err(RadarError::InvalidConfig(format!(
                "telemetry destination {} is not routable",
                self.destination
            )));
        }
        if self.report_interval == 0 {
            return Err(RadarError::InvalidConfig(
                "report interval must be at least one sweep".to_owned(),
            ));
        }
        let bound = max_frame_len(self.telemetry_bins(), MAX_INTEGER_DIGITS);
        if bound > self.max_payload {
            return Err(RadarError::FrameTooLarge {
                bound,
                limit: self.max_payload,
            });
        }
        Ok(())
    }
}
