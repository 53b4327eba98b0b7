//! Fixed-size forward/inverse FFT.
//!
//! Scaling convention: the forward transform is unnormalized and the inverse
//! divides by N, so `inverse(forward(x)) ≈ x`.
//!
//! No window is applied. Each block is transformed on its own, which leaves
//! spectral leakage and block-edge discontinuities in the reconstructed signal.

use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use std::sync::Arc;

use super::error::TransformError;

/// In-place complex FFT of a fixed size with preallocated scratch
pub struct SpectralTransform {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
}

impl SpectralTransform {
    /// Plan a transform of `size` points
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self::with_planner(&mut planner, size)
    }

    /// Plan with a shared planner so sibling transforms reuse its cached plans
    pub fn with_planner(planner: &mut FftPlanner<f32>, size: usize) -> Self {
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            size,
            forward,
            inverse,
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Time domain → frequency domain, unnormalized
    pub fn forward(&mut self, buffer: &mut [Complex32]) -> Result<(), TransformError> {
        self.check_len(buffer.len())?;
        self.forward.process_with_scratch(buffer, &mut self.scratch);
        Ok(())
    }

    /// Frequency domain → time domain, scaled by 1/N
    pub fn inverse(&mut self, buffer: &mut [Complex32]) -> Result<(), TransformError> {
        self.check_len(buffer.len())?;
        self.inverse.process_with_scratch(buffer, &mut self.scratch);

        let scale = 1.0 / self.size as f32;
        for bin in buffer.iter_mut() {
            *bin *= scale;
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<(), TransformError> {
        if len != self.size {
            return Err(TransformError::LengthMismatch {
                expected: self.size,
                got: len,
            });
        }
        Ok(())
    }
}

/// Load real samples into a complex buffer (imaginary parts zeroed)
pub fn load_real(samples: &[f32], buffer: &mut [Complex32]) {
    for (bin, &sample) in buffer.iter_mut().zip(samples) {
        *bin = Complex32::new(sample, 0.0);
    }
}

/// Copy the real parts of a complex buffer into `out`
pub fn real_part(buffer: &[Complex32], out: &mut [f32]) {
    for (sample, bin) in out.iter_mut().zip(buffer) {
        *sample = bin.re;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SIZE: usize = 256;

    /// Deterministic test signal: two partials plus a DC offset
    fn test_signal(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let t = i as f32 / size as f32;
                0.1 + 0.5 * (2.0 * PI * 3.0 * t).sin() + 0.25 * (2.0 * PI * 17.0 * t + 0.3).cos()
            })
            .collect()
    }

    #[test]
    fn test_round_trip_identity() {
        let signal = test_signal(SIZE);
        let mut buffer = vec![Complex32::new(0.0, 0.0); SIZE];
        load_real(&signal, &mut buffer);

        let mut transform = SpectralTransform::new(SIZE);
        transform.forward(&mut buffer).unwrap();
        transform.inverse(&mut buffer).unwrap();

        let mut restored = vec![0.0; SIZE];
        real_part(&buffer, &mut restored);

        for (a, b) in signal.iter().zip(&restored) {
            assert!((a - b).abs() <= 1e-4 * a.abs().max(1.0), "{} vs {}", a, b);
        }
        assert!(buffer.iter().all(|c| c.im.abs() < 1e-5));
    }

    #[test]
    fn test_impulse_has_flat_spectrum() {
        let mut buffer = vec![Complex32::new(0.0, 0.0); SIZE];
        buffer[0] = Complex32::new(1.0, 0.0);

        let mut transform = SpectralTransform::new(SIZE);
        transform.forward(&mut buffer).unwrap();

        for bin in &buffer {
            assert!((bin.norm() - 1.0).abs() < 1e-6);
            assert!(bin.arg().abs() < 1e-6);
        }
    }

    #[test]
    fn test_forward_is_unnormalized() {
        let mut buffer = vec![Complex32::new(1.0, 0.0); SIZE];
        let mut transform = SpectralTransform::new(SIZE);
        transform.forward(&mut buffer).unwrap();

        // DC bin carries the plain sum
        assert!((buffer[0].re - SIZE as f32).abs() < 1e-3);
        assert!(buffer[1..].iter().all(|c| c.norm() < 1e-3));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let mut transform = SpectralTransform::new(SIZE);
        let mut short = vec![Complex32::new(1.0, 0.0); SIZE - 1];

        assert_eq!(
            transform.forward(&mut short),
            Err(TransformError::LengthMismatch {
                expected: SIZE,
                got: SIZE - 1
            })
        );
        // Buffer untouched
        assert!(short.iter().all(|c| *c == Complex32::new(1.0, 0.0)));
    }
}
