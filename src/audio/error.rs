//! Audio pipeline error types

use std::path::PathBuf;

use thiserror::Error;

use crate::params::ConfigError;

/// Errors from the public transform and combine API
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// Buffer length differs from the planned transform size
    #[error("Buffer length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Errors that can occur in the render and playback hosts
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    DeviceConfig(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Stream failed to start or stopped with an error
    #[error("Audio stream failed: {0}")]
    StreamPlayError(String),

    /// WAV file could not be opened, decoded or written
    #[error("WAV I/O failed for {}: {source}", .path.display())]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// Main and sidechain files disagree on sample rate
    #[error("Sample rate mismatch: main={main}Hz, sidechain={sidechain}Hz")]
    SampleRateMismatch { main: u32, sidechain: u32 },

    /// Processor refused to prepare
    #[error("Invalid processor configuration: {0}")]
    Processor(#[from] ConfigError),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
