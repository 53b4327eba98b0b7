//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable numbers are collected here with:
//! - Physical units (samples, seconds, Hz, etc.)
//! - Documented ranges and meanings
//! - Validation where a bad value would break the audio path

mod render;
mod spectral;

// Re-export all types
pub use render::{PlaybackConfig, RenderConfig};
pub use spectral::{spectral_constants, CombineMode, ConfigError, SpectralConfig};
