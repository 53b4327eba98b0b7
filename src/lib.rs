//! xsynth library - Block-based spectral cross-synthesis

pub mod audio;
pub mod cli;
pub mod params;
