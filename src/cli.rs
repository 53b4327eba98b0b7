//! Command-line argument parsing.

use clap::{Parser, Subcommand};
use log::warn;
use std::path::PathBuf;

use crate::params::{
    spectral_constants::{DEFAULT_FFT_ORDER, DEFAULT_MAX_BLOCK_SIZE},
    CombineMode, PlaybackConfig, RenderConfig, SpectralConfig,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "xsynth")]
#[command(about = "Block-based spectral cross-synthesis", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process WAV files offline and write the result
    Render(RenderArgs),

    /// Stream WAV files through the processor to the default output device
    Play(PlayArgs),
}

/// Options shared by every subcommand
#[derive(clap::Args, Debug)]
pub struct SpectralArgs {
    /// Transform order (block size = 2^ORDER samples)
    #[arg(long, value_name = "ORDER", default_value_t = DEFAULT_FFT_ORDER)]
    pub fft_order: u32,

    /// Combine mode: cross (default), identity
    #[arg(long, value_name = "MODE", default_value = "cross")]
    pub mode: String,
}

impl SpectralArgs {
    /// Parse combine mode from command-line arguments
    pub fn parse_combine_mode(&self) -> CombineMode {
        match self.mode.to_lowercase().as_str() {
            "cross" | "cross-synthesis" | "vocode" => CombineMode::CrossSynthesis,
            "identity" | "bypass" => CombineMode::Identity,
            other => {
                warn!("Unknown combine mode '{}', using cross", other);
                CombineMode::CrossSynthesis
            }
        }
    }

    pub fn spectral_config(&self, sidechain_connected: bool) -> SpectralConfig {
        SpectralConfig {
            fft_order: self.fft_order,
            combine_mode: self.parse_combine_mode(),
            sidechain_connected,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Main (carrier) input WAV
    #[arg(long, value_name = "WAV")]
    pub main: PathBuf,

    /// Sidechain (modulator) input WAV
    #[arg(long, value_name = "WAV")]
    pub sidechain: Option<PathBuf>,

    /// Output WAV
    #[arg(short, long, value_name = "WAV")]
    pub output: PathBuf,

    /// Frames per simulated host callback
    #[arg(long, value_name = "FRAMES", default_value_t = DEFAULT_MAX_BLOCK_SIZE)]
    pub block_size: usize,

    /// Stop at the input length instead of flushing the last block
    #[arg(long)]
    pub no_tail: bool,

    #[command(flatten)]
    pub spectral: SpectralArgs,
}

impl RenderArgs {
    pub fn render_config(&self) -> RenderConfig {
        let mut config =
            RenderConfig::new(self.main.clone(), self.sidechain.clone(), self.output.clone());
        config.block_size = self.block_size;
        config.flush_tail = !self.no_tail;
        config
    }

    pub fn spectral_config(&self) -> SpectralConfig {
        self.spectral.spectral_config(self.sidechain.is_some())
    }
}

#[derive(clap::Args, Debug)]
pub struct PlayArgs {
    /// Main (carrier) input WAV
    #[arg(long, value_name = "WAV")]
    pub main: PathBuf,

    /// Sidechain (modulator) input WAV
    #[arg(long, value_name = "WAV")]
    pub sidechain: Option<PathBuf>,

    /// Also record the processed output to this WAV
    #[arg(long, value_name = "WAV")]
    pub record: Option<PathBuf>,

    #[command(flatten)]
    pub spectral: SpectralArgs,
}

impl PlayArgs {
    pub fn playback_config(&self) -> PlaybackConfig {
        let mut config = PlaybackConfig::new(self.main.clone(), self.sidechain.clone());
        config.record_path = self.record.clone();
        config
    }

    pub fn spectral_config(&self) -> SpectralConfig {
        self.spectral.spectral_config(self.sidechain.is_some())
    }
}
