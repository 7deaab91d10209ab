//! Reference chirp synthesis

use std::f64::consts::PI;

/// Quadratic-phase (linear sweep) reference, computed once and shared read-only
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceChirp {
    pub i: Vec<f32>,
    pub q: Vec<f32>,
}

impl ReferenceChirp {
    /// phase(t) = pi * (bw / T) * t^2, with T = n / fs
    pub fn synthesize(sample_rate: f32, bandwidth: f32, n: usize) -> Self {
        let fs = f64::from(sample_rate);
        let period = n as f64 / fs;
        let rate = f64::from(bandwidth) / period;
        // Phase reaches hundreds of radians by the end of the sweep, keep it in double
        let (i, q) = (0..n)
            .map(|idx| {
                let t = idx as f64 / fs;
                let phase = PI * rate * t * t;
                (phase.cos() as f32, phase.sin() as f32)
            })
            .unzip();
        Self { i, q }
    }

    pub fn len(&self) -> usize {
        self.i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    /// Interleaved I/Q in the DAC's fixed point range
    pub fn to_tx_buffer(&self, scale: f32) -> Vec<i16> {
        self.i
            .iter()
            .zip(&self.q)
            .flat_map(|(i, q)| [(i * scale) as i16, (q * scale) as i16])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_phase_start() {
        let chirp = ReferenceChirp::synthesize(5e6, 2e6, 256);
        assert_eq!(chirp.len(), 256);
        assert_eq!(chirp.i[0], 1.0);
        assert_eq!(chirp.q[0], 0.0);
    }

    #[test]
    fn test_end_of_sweep_phase() {
        let n = 256;
        let chirp = ReferenceChirp::synthesize(5e6, 2e6, n);
        // Last sample, phase = pi * (bw / T) * t^2 ~ 320 rad
        let t = (n - 1) as f64 / 5e6;
        let phase = PI * (2e6 / (n as f64 / 5e6)) * t * t;
        assert!(phase > 300.0);
        assert_relative_eq!(chirp.i[n - 1], phase.cos() as f32, epsilon = 1e-6);
        assert_relative_eq!(chirp.q[n - 1], phase.sin() as f32, epsilon = 1e-6);
    }

    #[test]
    fn test_deterministic() {
        let a = ReferenceChirp::synthesize(5e6, 2e6, 256);
        let b = ReferenceChirp::synthesize(5e6, 2e6, 256);
        assert!(a
            .i
            .iter()
            .chain(&a.q)
            .zip(b.i.iter().chain(&b.q))
            .all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn test_unit_amplitude() {
        let chirp = ReferenceChirp::synthesize(5e6, 2e6, 256);
        for (i, q) in chirp.i.iter().zip(&chirp.q) {
            assert_relative_eq!(i * i + q * q, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_tx_buffer_interleaved() {
        let chirp = ReferenceChirp::synthesize(5e6, 2e6, 8);
        let tx = chirp.to_tx_buffer(2000.0);
        assert_eq!(tx.len(), 16);
        assert_eq!(tx[0], 2000);
        assert_eq!(tx[1], 0);
        assert_eq!(tx[2], (chirp.i[1] * 2000.0) as i16);
        assert_eq!(tx[3], (chirp.q[1] * 2000.0) as i16);
    }
}
