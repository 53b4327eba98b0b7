//! Spectral engine configuration and constants.

use thiserror::Error;

use spectral_constants::{MAX_FFT_ORDER, MIN_FFT_ORDER};

/// Spectral engine constants
pub mod spectral_constants {
    /// Default transform order
    /// 8 → 256 samples (= 5.8ms @ 44.1kHz)
    pub const DEFAULT_FFT_ORDER: u32 = 8;

    /// Smallest accepted transform order (2 samples)
    pub const MIN_FFT_ORDER: u32 = 1;

    /// Largest accepted transform order (65536 samples)
    pub const MAX_FFT_ORDER: u32 = 16;

    /// Default host block size (frames per callback)
    pub const DEFAULT_MAX_BLOCK_SIZE: usize = 512;
}

/// How the main and sidechain spectra are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineMode {
    /// Multiply magnitudes, add phases (vocoding)
    #[default]
    CrossSynthesis,

    /// Forward then inverse transform of the main block only.
    /// Output is the main input delayed by one block; the sidechain is ignored.
    Identity,
}

impl CombineMode {
    /// Whether this mode reads the sidechain stream
    pub fn requires_sidechain(self) -> bool {
        matches!(self, Self::CrossSynthesis)
    }
}

/// Errors detected while preparing the processor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Transform order outside the supported range
    #[error("FFT order must be in {min}..={max}, got {order}")]
    InvalidFftOrder { order: u32, min: u32, max: u32 },

    /// Sample rate zero, negative or NaN
    #[error("Sample rate must be > 0, got {0}")]
    InvalidSampleRate(f64),

    /// Host announced an empty block size
    #[error("Maximum block size must be > 0")]
    ZeroBlockSize,

    /// Combine mode needs the sidechain bus but the host has none
    #[error("{mode:?} requires a sidechain input, but none is connected")]
    SidechainRequired { mode: CombineMode },

    /// A pipeline buffer disagrees with the transform size
    #[error("Buffer capacity mismatch: {buffer} holds {actual} samples, transform expects {expected}")]
    CapacityMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Spectral processing configuration
#[derive(Debug, Clone)]
pub struct SpectralConfig {
    /// Transform order (fft_size = 2^fft_order)
    pub fft_order: u32,

    /// Spectrum combination rule
    pub combine_mode: CombineMode,

    /// Whether the host delivers a sidechain stream
    pub sidechain_connected: bool,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            fft_order: spectral_constants::DEFAULT_FFT_ORDER,
            combine_mode: CombineMode::default(),
            sidechain_connected: true,
        }
    }
}

impl SpectralConfig {
    /// Transform size in samples (0 if the order cannot be represented)
    pub fn fft_size(&self) -> usize {
        1usize.checked_shl(self.fft_order).unwrap_or(0)
    }

    /// Duration of one transform block (milliseconds)
    pub fn block_duration_ms(&self, sample_rate_hz: f64) -> f64 {
        self.fft_size() as f64 / sample_rate_hz * 1000.0
    }

    /// Validate configuration (order in range, sidechain present when needed)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_FFT_ORDER..=MAX_FFT_ORDER).contains(&self.fft_order) {
            return Err(ConfigError::InvalidFftOrder {
                order: self.fft_order,
                min: MIN_FFT_ORDER,
                max: MAX_FFT_ORDER,
            });
        }
        if self.combine_mode.requires_sidechain() && !self.sidechain_connected {
            return Err(ConfigError::SidechainRequired {
                mode: self.combine_mode,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fft_size() {
        let config = SpectralConfig::default();
        assert_eq!(config.fft_size(), 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fft_order_out_of_range() {
        let mut config = SpectralConfig::default();

        config.fft_order = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFftOrder { order: 0, .. })
        ));

        config.fft_order = 70;
        assert_eq!(config.fft_size(), 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sidechain_required_for_cross_synthesis() {
        let config = SpectralConfig {
            sidechain_connected: false,
            ..SpectralConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SidechainRequired {
                mode: CombineMode::CrossSynthesis
            })
        );

        // Identity mode runs without a sidechain
        let identity = SpectralConfig {
            combine_mode: CombineMode::Identity,
            ..config
        };
        assert!(identity.validate().is_ok());
    }

    #[test]
    fn test_block_duration() {
        let config = SpectralConfig::default();
        // 256 samples @ 44.1kHz ≈ 5.8ms
        assert!((config.block_duration_ms(44100.0) - 5.805).abs() < 0.01);
    }
}
