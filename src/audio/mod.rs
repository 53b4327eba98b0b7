//! Spectral cross-synthesis pipeline and its hosts.
//!
//! The real-time core (accumulation, FFT, polar combine, block processing)
//! never allocates or blocks once prepared. The offline renderer and the
//! live playback system drive it from WAV files.

mod cross;
mod error;
mod fft;
mod fifo;
mod monitor;
mod processor;
mod system;
mod wav;

// Re-export public types
pub use cross::{combine, combine_in_place, to_polar, Polar};
pub use error::{AudioError, AudioResult, TransformError};
pub use fft::{load_real, real_part, SpectralTransform};
pub use fifo::{BlockSlot, FifoAccumulator, PushOutcome, SlotState};
pub use processor::{
    ChannelRole, CrossSynthProcessor, ProcessingContext, ProcessorStats, StatsSnapshot,
};
pub use system::PlaybackSystem;
pub use wav::{load_inputs, read_mono, render, write_mono, MonoClip};
