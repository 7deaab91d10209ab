use std::ops::{Add, Mul, Sub};

use num_traits::Float;

#[derive(Clone, Copy, Default, PartialEq, PartialOrd, Debug)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T: Float> Complex<T> {
    /// Unit phasor e^(j*theta)
    pub fn from_phase(theta: T) -> Self {
        Self::new(theta.cos(), theta.sin())
    }

    pub fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }

    pub fn scale(self, k: T) -> Self {
        Self::new(self.re * k, self.im * k)
    }

    pub fn norm_sqr(self) -> T {
        self.re * self.re + self.im * self.im
    }

    pub fn norm(self) -> T {
        self.norm_sqr().sqrt()
    }
}

impl<T: Float> Add for Complex<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl<T: Float> Sub for Complex<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl<T: Float> Mul for Complex<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// The atomic unit of every signal buffer after the radio
pub type ComplexSample = Complex<f32>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_conj_product() {
        let a = ComplexSample::new(3.0, 4.0);
        let p = a * a.conj();
        assert_eq!(p, ComplexSample::new(25.0, 0.0));
        assert_eq!(a.norm(), 5.0);
    }

    #[test]
    fn test_from_phase() {
        let c = Complex::<f64>::from_phase(std::f64::consts::FRAC_PI_4);
        assert_relative_eq!(c.re, 0.7071067811865476, epsilon = 1e-12);
        assert_relative_eq!(c.im, 0.7071067811865476, epsilon = 1e-12);
    }
}
