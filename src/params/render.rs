//! Offline render and live playback configuration.

use std::path::PathBuf;

use super::spectral::spectral_constants::DEFAULT_MAX_BLOCK_SIZE;

/// Offline render configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Main (carrier) input WAV
    pub main_path: PathBuf,

    /// Sidechain (modulator) input WAV, if any
    pub sidechain_path: Option<PathBuf>,

    /// Rendered output WAV (mono, 32-bit float)
    pub output_path: PathBuf,

    /// Frames handed to the processor per simulated callback
    pub block_size: usize,

    /// Append one block of silence so the last input block is flushed
    pub flush_tail: bool,
}

impl RenderConfig {
    pub fn new(main_path: PathBuf, sidechain_path: Option<PathBuf>, output_path: PathBuf) -> Self {
        Self {
            main_path,
            sidechain_path,
            output_path,
            block_size: DEFAULT_MAX_BLOCK_SIZE,
            flush_tail: true,
        }
    }
}

/// Live playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Main (carrier) input WAV
    pub main_path: PathBuf,

    /// Sidechain (modulator) input WAV, if any
    pub sidechain_path: Option<PathBuf>,

    /// Record processed output to this WAV while playing
    pub record_path: Option<PathBuf>,

    /// Largest callback the device may request (frames)
    /// Larger callbacks are processed in chunks of this size
    pub max_block_size: usize,

    /// Recording ring buffer length (seconds of audio)
    /// 2.0 = the writer thread may stall up to 2s before samples are lost
    pub record_buffer_secs: f32,

    /// How often the control thread drains the recorder (milliseconds)
    pub poll_interval_ms: u64,
}

impl PlaybackConfig {
    pub fn new(main_path: PathBuf, sidechain_path: Option<PathBuf>) -> Self {
        Self {
            main_path,
            sidechain_path,
            record_path: None,
            max_block_size: 4096,
            record_buffer_secs: 2.0,
            poll_interval_ms: 50,
        }
    }

    /// Recording ring buffer capacity in samples
    pub fn record_capacity(&self, sample_rate_hz: u32) -> usize {
        ((sample_rate_hz as f32 * self.record_buffer_secs).ceil() as usize).max(1)
    }
}
