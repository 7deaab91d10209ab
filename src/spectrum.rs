//! Spectral analysis of one dechirped sweep

use crate::{
    complex::ComplexSample,
    error::RadarResult,
    fft::Radix2Fft,
};

/// Strongest non-DC bin in the first half of the spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeEstimate {
    pub bin: usize,
    pub magnitude: f32,
}

/// Scan bins [1, len) for the maximum, the lowest index wins ties
pub fn find_peak(mags: &[f32]) -> RangeEstimate {
    let mut peak = RangeEstimate {
        bin: 1,
        magnitude: 0.0,
    };
    for (bin, &magnitude) in mags.iter().enumerate().skip(1) {
        if magnitude > peak.magnitude {
            peak = RangeEstimate { bin, magnitude };
        }
    }
    peak
}

pub struct SpectralAnalyzer {
    fft: Radix2Fft,
}

impl SpectralAnalyzer {
    pub fn new(n: usize) -> RadarResult<Self> {
        Ok(Self {
            fft: Radix2Fft::new(n)?,
        })
    }

    pub fn len(&self) -> usize {
        self.fft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fft.is_empty()
    }

    /// FFT `signal` in place, write the first-half magnitudes to `mags`
    /// (length N/2) and return the peak.
    ///
    /// Only bins [0, N/2) are emitted. Mixing is rx * conj(ref), so an echo
    /// delayed by k samples beats at a negative frequency and lands near bin
    /// N - bw * k / fs, in the half this does not emit. Its first-half peak does
    /// not track range. The full spectrum is left in `signal` for callers that
    /// need the mirrored bins.
    pub fn analyze(&self, signal: &mut [ComplexSample], mags: &mut [f32]) -> RangeEstimate {
        assert_eq!(mags.len(), self.len() / 2);
        self.fft.forward(signal);
        for (mag, bin) in mags.iter_mut().zip(signal.iter()) {
            *mag = bin.norm();
        }
        find_peak(mags)
    }
}
