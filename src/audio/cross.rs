//! Polar cross-synthesis of two spectra.
//!
//! Each combined bin takes the product of the input magnitudes and the sum of
//! the input phases. The phase sum is never wrapped; it is only consumed by
//! [`Polar::to_complex`], which is 2π-periodic.

use rustfft::num_complex::Complex32;

use super::error::TransformError;

/// One spectral bin in magnitude/phase form
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Polar {
    pub magnitude: f32,
    /// Radians, unbounded
    pub phase: f32,
}

impl Polar {
    pub fn new(magnitude: f32, phase: f32) -> Self {
        Self { magnitude, phase }
    }

    /// Multiply magnitudes, add phases
    pub fn cross(self, other: Polar) -> Polar {
        Polar {
            magnitude: self.magnitude * other.magnitude,
            phase: self.phase + other.phase,
        }
    }

    pub fn to_complex(self) -> Complex32 {
        Complex32::from_polar(self.magnitude, self.phase)
    }
}

/// Split a bin into magnitude and phase.
///
/// A zero bin yields magnitude 0 and phase 0 (`atan2(0, 0)`).
pub fn to_polar(bin: Complex32) -> Polar {
    let (magnitude, phase) = bin.to_polar();
    Polar { magnitude, phase }
}

/// Cross-synthesize `a` and `b` into `out`
pub fn combine(a: &[Complex32], b: &[Complex32], out: &mut [Complex32]) -> Result<(), TransformError> {
    check_len(a.len(), b.len())?;
    check_len(a.len(), out.len())?;

    for ((bin, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *bin = to_polar(x).cross(to_polar(y)).to_complex();
    }
    Ok(())
}

/// Cross-synthesize `b` into `a`, overwriting `a`
pub fn combine_in_place(a: &mut [Complex32], b: &[Complex32]) -> Result<(), TransformError> {
    check_len(a.len(), b.len())?;

    for (bin, &y) in a.iter_mut().zip(b) {
        *bin = to_polar(*bin).cross(to_polar(y)).to_complex();
    }
    Ok(())
}

fn check_len(expected: usize, got: usize) -> Result<(), TransformError> {
    if expected != got {
        return Err(TransformError::LengthMismatch { expected, got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const TOLERANCE: f32 = 1e-5;

    fn close(a: Complex32, b: Complex32) -> bool {
        (a - b).norm() < TOLERANCE
    }

    #[test]
    fn test_combine_known_bins() {
        let pairs = [
            ((1.0, 0.0), (1.0, 0.0)),
            ((2.0, 0.5), (3.0, -0.25)),
            ((0.5, PI / 2.0), (4.0, PI / 4.0)),
            ((1.5, -2.0), (0.2, 1.0)),
        ];
        let a: Vec<Complex32> = pairs
            .iter()
            .map(|&((m, p), _)| Complex32::from_polar(m, p))
            .collect();
        let b: Vec<Complex32> = pairs
            .iter()
            .map(|&(_, (m, p))| Complex32::from_polar(m, p))
            .collect();
        let mut out = vec![Complex32::new(0.0, 0.0); pairs.len()];

        combine(&a, &b, &mut out).unwrap();

        for (bin, &((m1, p1), (m2, p2))) in out.iter().zip(&pairs) {
            assert!((bin.norm() - m1 * m2).abs() < TOLERANCE);
            assert!(close(*bin, Complex32::from_polar(m1 * m2, p1 + p2)));
        }
    }

    #[test]
    fn test_phase_sum_is_not_wrapped() {
        let a = Polar::new(1.0, 3.0);
        let b = Polar::new(2.0, 3.0);
        let crossed = a.cross(b);

        assert_eq!(crossed.phase, 6.0);
        // Reconstruction is periodic, so the unwrapped sum is harmless
        assert!(close(
            crossed.to_complex(),
            Complex32::from_polar(2.0, 6.0 - 2.0 * PI)
        ));
    }

    #[test]
    fn test_zero_bin_is_safe() {
        let zero = Complex32::new(0.0, 0.0);
        assert_eq!(to_polar(zero), Polar::new(0.0, 0.0));

        let mut a = vec![
            Complex32::new(1.0, 1.0),
            zero,
            Complex32::new(-2.0, 0.5),
        ];
        let b = vec![Complex32::new(0.5, -0.5), Complex32::new(3.0, 4.0), zero];

        combine_in_place(&mut a, &b).unwrap();

        assert!(a.iter().all(|c| c.re.is_finite() && c.im.is_finite()));
        assert_eq!(a[1].norm(), 0.0);
        assert_eq!(a[2].norm(), 0.0);
        // sqrt(2) * sqrt(0.5) = 1, phase π/4 - π/4 = 0
        assert!(close(a[0], Complex32::new(1.0, 0.0)));
    }

    #[test]
    fn test_in_place_matches_out_of_place() {
        let a: Vec<Complex32> = (0..16)
            .map(|i| Complex32::new(i as f32 * 0.1, 1.0 - i as f32 * 0.05))
            .collect();
        let b: Vec<Complex32> = (0..16)
            .map(|i| Complex32::new((i as f32).cos(), (i as f32).sin()))
            .collect();

        let mut out = vec![Complex32::new(0.0, 0.0); 16];
        combine(&a, &b, &mut out).unwrap();

        let mut in_place = a.clone();
        combine_in_place(&mut in_place, &b).unwrap();

        assert!(out.iter().zip(&in_place).all(|(x, y)| close(*x, *y)));
    }

    #[test]
    fn test_length_mismatch() {
        let a = vec![Complex32::new(1.0, 0.0); 4];
        let b = vec![Complex32::new(1.0, 0.0); 3];
        let mut out = vec![Complex32::new(0.0, 0.0); 4];

        assert_eq!(
            combine(&a, &b, &mut out),
            Err(TransformError::LengthMismatch {
                expected: 4,
                got: 3
            })
        );
    }
}
