//! Per-sweep processing: dechirp, spectrum, telemetry frame

use num_traits::AsPrimitive;

use crate::{
    chirp::ReferenceChirp,
    complex::ComplexSample,
    config::RadarConfig,
    error::RadarResult,
    mixer::DeChirpMixer,
    spectrum::{RangeEstimate, SpectralAnalyzer},
    telemetry::{EncodedFrame, TelemetryEncoder},
};

/// Owns the reference chirp and the working buffers for one sweep.
/// Every buffer is completely overwritten each sweep, nothing carries over.
pub struct SweepProcessor {
    reference: ReferenceChirp,
    mixer: DeChirpMixer,
    analyzer: SpectralAnalyzer,
    encoder: TelemetryEncoder,
    mixed: Vec<ComplexSample>,
    mags: Vec<f32>,
}

impl SweepProcessor {
    pub fn new(config: &RadarConfig) -> RadarResult<Self> {
        let n = config.fft_size;
        Ok(Self {
            reference: ReferenceChirp::synthesize(config.sample_rate, config.bandwidth, n),
            mixer: DeChirpMixer::new(n),
            analyzer: SpectralAnalyzer::new(n)?,
            encoder: TelemetryEncoder::new(config.telemetry_bins(), config.max_payload)?,
            mixed: vec![ComplexSample::default(); n],
            mags: vec![0.0; n / 2],
        })
    }

    pub fn reference(&self) -> &ReferenceChirp {
        &self.reference
    }

    /// Demodulate and analyze one raw interleaved I/Q frame
    pub fn process<S: AsPrimitive<f32>>(&mut self, raw: &[S]) -> RangeEstimate {
        self.mixer.mix(raw, &self.reference, &mut self.mixed);
        self.analyzer.analyze(&mut self.mixed, &mut self.mags)
    }

    /// First half magnitude spectrum of the last processed sweep
    pub fn magnitudes(&self) -> &[f32] {
        &self.mags
    }

    pub fn encode(&mut self) -> RadarResult<EncodedFrame<'_>> {
        self.encoder.encode(&self.mags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryFrame;
    use approx::assert_relative_eq;

    #[test]
    fn test_sweep_of_echo() {
        let config = RadarConfig::default();
        let mut processor = SweepProcessor::new(&config).unwrap();
        let raw = processor.reference().to_tx_buffer(config.tx_scale);
        let estimate = processor.process(&raw);
        // Zero range target collapses onto DC, the peak search only sees the
        // window's main lobe spilling into bin 1
        let mags = processor.magnitudes();
        assert_eq!(mags.len(), 128);
        assert_eq!(estimate.bin, 1);
        assert!(mags[0] > estimate.magnitude);
        let expected = mags.to_vec();
        let frame = processor.encode().unwrap();
        let parsed = TelemetryFrame::parse(frame.bytes).unwrap();
        assert_eq!(parsed.magnitudes.len(), 128);
        for (got, sent) in parsed.magnitudes.iter().zip(&expected) {
            assert_relative_eq!(*got, *sent, epsilon = 0.006, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_sweeps_are_independent() {
        let config = RadarConfig::default();
        let mut processor = SweepProcessor::new(&config).unwrap();
        let quiet = vec![0i16; 2 * config.fft_size];
        let loud = processor.reference().to_tx_buffer(config.tx_scale);
        processor.process(&quiet);
        let first = processor.encode().unwrap().bytes.to_vec();
        processor.process(&loud);
        processor.process(&quiet);
        let again = processor.encode().unwrap().bytes.to_vec();
        assert_eq!(first, again);
    }
}
