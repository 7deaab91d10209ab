//! Dechirp (stretch processing) against the reference

use std::f32::consts::PI;

use num_traits::AsPrimitive;

use crate::{chirp::ReferenceChirp, complex::ComplexSample};

pub fn hann(n: usize) -> Vec<f32> {
    let denom = (n.max(2) - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
        .collect()
}

pub struct DeChirpMixer {
    window: Vec<f32>,
}

impl DeChirpMixer {
    pub fn new(n: usize) -> Self {
        Self { window: hann(n) }
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Windowed rx * conj(ref) for one sweep.
    /// `raw` is interleaved I/Q and must hold exactly `2 * N` values.
    pub fn mix<S>(&self, raw: &[S], reference: &ReferenceChirp, out: &mut [ComplexSample])
    where
        S: AsPrimitive<f32>,
    {
        let n = self.window.len();
        assert_eq!(raw.len(), 2 * n, "Raw frame must hold N I/Q pairs");
        assert_eq!(reference.len(), n);
        assert_eq!(out.len(), n);
        for (i, pair) in raw.chunks_exact(2).enumerate() {
            let rx_i: f32 = pair[0].as_();
            let rx_q: f32 = pair[1].as_();
            let (ref_i, ref_q) = (reference.i[i], reference.q[i]);
            let w = self.window[i];
            out[i].re = (rx_i * ref_i + rx_q * ref_q) * w;
            out[i].im = (rx_q * ref_i - rx_i * ref_q) * w;
        }
    }
}
