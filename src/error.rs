//! Error types for the radar core

use std::io;
use thiserror::Error;

use crate::frontend::Endpoint;

pub type RadarResult<T> = Result<T, RadarError>;

#[derive(Error, Debug)]
pub enum RadarError {
    /// Operating parameters that can never produce a working radar
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Endpoint missing or unreachable during bring-up
    #[error("{endpoint} endpoint not found: {reason}")]
    EndpointNotFound { endpoint: Endpoint, reason: String },

    #[error("Front-end configuration failed: {0}")]
    FrontEndConfig(String),

    /// Could not hand the reference waveform to the transmitter
    #[error("Transmit failed: {0}")]
    Transmit(String),

    #[error("Telemetry transport init failed: {0}")]
    TransportInit(#[source] io::Error),

    /// A single receive call failed
    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    #[error("Short frame: expected {expected} samples, got {actual}")]
    ShortFrame { expected: usize, actual: usize },

    /// Too many receive failures in a row, the radios are no longer in step
    #[error("Lost hardware sync after {failures} consecutive receive failures")]
    LostSync { failures: u32 },

    /// Telemetry frame would not fit the datagram payload
    #[error("Telemetry frame of up to {bound} bytes exceeds payload limit of {limit} bytes")]
    FrameTooLarge { bound: usize, limit: usize },

    #[error("Magnitude {value} in bin {bin} cannot be encoded")]
    InvalidMagnitude { bin: usize, value: f32 },

    #[error("Failed to install shutdown handler: {0}")]
    ShutdownHandler(#[from] ctrlc::Error),

    #[error("Replay source error: {0}")]
    Replay(#[from] io::Error),
}

impl RadarError {
    /// Recoverable errors are retried by the acquisition loop, everything else aborts
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RadarError::Acquisition(_) | RadarError::ShortFrame { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(RadarError::Acquisition("timeout".into()).is_recoverable());
        assert!(RadarError::ShortFrame {
            expected: 512,
            actual: 12
        }
        .is_recoverable());
        assert!(!RadarError::LostSync { failures: 5 }.is_recoverable());
        assert!(!RadarError::Transmit("no buffer".into()).is_recoverable());
    }
}
