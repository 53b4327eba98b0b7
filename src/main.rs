//! xsynth - spectral cross-synthesis from the command line
//!
//! The main input's spectrum is multiplied in magnitude and shifted in phase
//! by the sidechain's spectrum, block by block.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use xsynth::audio::{self, PlaybackSystem, StatsSnapshot};
use xsynth::cli::{Args, Command};

fn report(stats: &StatsSnapshot) {
    info!(
        "{} frames, {} combine cycles, {} dropped blocks",
        stats.frames_processed, stats.combine_cycles, stats.dropped_blocks
    );
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Render(render) => {
            let config = render.render_config();
            let stats = audio::render(&config, render.spectral_config())
                .with_context(|| format!("rendering {}", config.main_path.display()))?;
            report(&stats);
        }
        Command::Play(play) => {
            let system = PlaybackSystem::new(&play.playback_config(), play.spectral_config())
                .context("starting playback")?;
            info!("Playing...");
            let stats = system.wait()?;
            report(&stats);
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
