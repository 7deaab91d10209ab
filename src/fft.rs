//! Iterative in-place radix-2 decimation-in-time FFT.
//!
//! Output bins are in natural order and no normalization is applied in either
//! direction, so `inverse(forward(x)) == N * x`.

use std::f64::consts::PI;

use crate::{
    complex::ComplexSample,
    error::{RadarError, RadarResult},
};

pub struct Radix2Fft {
    len: usize,
    // e^(-j*2*pi*k/N) for k in [0, N/2)
    twiddles: Vec<ComplexSample>,
    // Swap pairs (i, j) with i < j for the bit reversal permutation
    swaps: Vec<(usize, usize)>,
}

impl Radix2Fft {
    pub fn new(len: usize) -> RadarResult<Self> {
        if len == 0 || !len.is_power_of_two() {
            return Err(RadarError::InvalidConfig(format!(
                "FFT length {} is not a power of two",
                len
            )));
        }
        // Compute in double precision, the f32 recurrence drifts at large N
        let twiddles = (0..len / 2)
            .map(|k| {
                let angle = -2.0 * PI * k as f64 / len as f64;
                ComplexSample::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();
        let bits = len.trailing_zeros();
        let swaps = (0..len)
            .filter_map(|i| {
                let j = reverse_bits(i, bits);
                (i < j).then(|| (i, j))
            })
            .collect();
        Ok(Self {
            len,
            twiddles,
            swaps,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn forward(&self, buf: &mut [ComplexSample]) {
        self.process(buf, false)
    }

    /// Unscaled inverse, divide by N to recover the input
    pub fn inverse(&self, buf: &mut [ComplexSample]) {
        self.process(buf, true)
    }

    fn process(&self, buf: &mut [ComplexSample], inverse: bool) {
        assert_eq!(buf.len(), self.len, "Buffer must match the planned length");
        for &(i, j) in &self.swaps {
            buf.swap(i, j);
        }
        let mut half = 1;
        while half < self.len {
            let span = half * 2;
            // Twiddle index stride for this stage
            let stride = self.len / span;
            for start in (0..self.len).step_by(span) {
                for k in 0..half {
                    let mut w = self.twiddles[k * stride];
                    if inverse {
                        w = w.conj();
                    }
                    let a = buf[start + k];
                    let b = buf[start + k + half] * w;
                    buf[start + k] = a + b;
                    buf[start + k + half] = a - b;
                }
            }
            half = span;
        }
    }
}

fn reverse_bits(x: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    x.reverse_bits() >> (usize::BITS - bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn naive_dft(input: &[ComplexSample]) -> Vec<ComplexSample> {
        let n = input.len();
        (0..n)
            .map(|k| {
                input
                    .iter()
                    .enumerate()
                    .fold(ComplexSample::default(), |acc, (t, x)| {
                        let angle = -2.0 * PI * (k * t % n) as f64 / n as f64;
                        acc + *x * ComplexSample::new(angle.cos() as f32, angle.sin() as f32)
                    })
            })
            .collect()
    }

    fn random_signal(n: usize, seed: u64) -> Vec<ComplexSample> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| ComplexSample::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect()
    }

    #[test]
    fn test_rejects_bad_length() {
        assert!(Radix2Fft::new(0).is_err());
        assert!(Radix2Fft::new(96).is_err());
        assert!(Radix2Fft::new(1).is_ok());
    }

    #[test]
    fn test_bit_reverse() {
        assert_eq!(reverse_bits(0b001, 3), 0b100);
        assert_eq!(reverse_bits(0b110, 3), 0b011);
        assert_eq!(reverse_bits(5, 0), 0);
    }

    #[test]
    fn test_impulse_is_flat() {
        let fft = Radix2Fft::new(16).unwrap();
        let mut buf = vec![ComplexSample::default(); 16];
        buf[0] = ComplexSample::new(1.0, 0.0);
        fft.forward(&mut buf);
        for bin in buf {
            assert_abs_diff_eq!(bin.re, 1.0, epsilon = 1e-6);
            assert_abs_diff_eq!(bin.im, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_tone_lands_in_natural_order_unscaled() {
        let n = 64;
        let fft = Radix2Fft::new(n).unwrap();
        let mut buf: Vec<_> = (0..n)
            .map(|t| {
                let angle = 2.0 * std::f32::consts::PI * 5.0 * t as f32 / n as f32;
                ComplexSample::from_phase(angle)
            })
            .collect();
        fft.forward(&mut buf);
        assert_abs_diff_eq!(buf[5].norm(), n as f32, epsilon = 1e-3);
        for (k, bin) in buf.iter().enumerate().filter(|(k, _)| *k != 5) {
            assert!(bin.norm() < 1e-2, "leak into bin {}", k);
        }
    }

    #[test]
    fn test_matches_naive_dft() {
        let input = random_signal(32, 7);
        let expected = naive_dft(&input);
        let fft = Radix2Fft::new(32).unwrap();
        let mut buf = input;
        fft.forward(&mut buf);
        for (a, b) in buf.iter().zip(&expected) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-4);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_inverse_reconstructs() {
        for (pow, seed) in (1..=10).zip(100..) {
            let n = 1usize << pow;
            let fft = Radix2Fft::new(n).unwrap();
            let input = random_signal(n, seed);
            let mut buf = input.clone();
            fft.forward(&mut buf);
            fft.inverse(&mut buf);
            for (x, y) in input.iter().zip(&buf) {
                assert_abs_diff_eq!(x.re, y.re / n as f32, epsilon = 1e-4);
                assert_abs_diff_eq!(x.im, y.im / n as f32, epsilon = 1e-4);
            }
        }
    }
}
