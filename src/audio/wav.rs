//! WAV input/output and offline rendering.

use log::{debug, info};
use std::path::Path;

use super::error::{AudioError, AudioResult};
use super::processor::{CrossSynthProcessor, StatsSnapshot};
use crate::params::{RenderConfig, SpectralConfig};

/// Mono audio loaded into memory
#[derive(Debug, Clone, PartialEq)]
pub struct MonoClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoClip {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Up to `len` samples starting at `start`, empty past the end
    pub fn window(&self, start: usize, len: usize) -> &[f32] {
        let start = start.min(self.samples.len());
        let end = start.saturating_add(len).min(self.samples.len());
        &self.samples[start..end]
    }
}

fn wav_error(path: &Path) -> impl FnOnce(hound::Error) -> AudioError + '_ {
    move |source| AudioError::Wav {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a WAV file, averaging all channels down to mono
pub fn read_mono(path: &Path) -> AudioResult<MonoClip> {
    let mut reader = hound::WavReader::open(path).map_err(wav_error(path))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_error(path))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error(path))?
        }
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    let clip = MonoClip {
        samples,
        sample_rate: spec.sample_rate,
    };
    debug!(
        "Loaded {}: {} channels, {}Hz, {:.2}s",
        path.display(),
        spec.channels,
        spec.sample_rate,
        clip.duration_secs()
    );
    Ok(clip)
}

/// Write mono 32-bit float WAV
pub fn write_mono(path: &Path, clip: &MonoClip) -> AudioResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(wav_error(path))?;
    for &sample in &clip.samples {
        writer.write_sample(sample).map_err(wav_error(path))?;
    }
    writer.finalize().map_err(wav_error(path))
}

/// Load the main and optional sidechain clips, checking their rates agree
pub fn load_inputs(
    main_path: &Path,
    sidechain_path: Option<&Path>,
) -> AudioResult<(MonoClip, Option<MonoClip>)> {
    let main = read_mono(main_path)?;
    let sidechain = sidechain_path.map(read_mono).transpose()?;

    if let Some(sidechain) = &sidechain {
        if sidechain.sample_rate != main.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                main: main.sample_rate,
                sidechain: sidechain.sample_rate,
            });
        }
    }
    Ok((main, sidechain))
}

/// Render the configured inputs through the processor into a WAV file.
///
/// The host callback is simulated with blocks of `config.block_size` frames.
pub fn render(config: &RenderConfig, spectral: SpectralConfig) -> AudioResult<StatsSnapshot> {
    let (main, sidechain) = load_inputs(&config.main_path, config.sidechain_path.as_deref())?;

    let mut processor = CrossSynthProcessor::new(spectral);
    processor.prepare(f64::from(main.sample_rate), config.block_size)?;

    let tail = if config.flush_tail {
        processor.latency_samples()
    } else {
        0
    };
    let mut rendered = vec![0.0f32; main.samples.len() + tail];

    for (index, out) in rendered.chunks_mut(config.block_size).enumerate() {
        let start = index * config.block_size;
        let main_block = main.window(start, out.len());
        let sidechain_block = sidechain.as_ref().map(|clip| clip.window(start, out.len()));
        processor.process_block(main_block, sidechain_block, out);
    }

    let stats = processor.stats();
    processor.release();

    let output = MonoClip {
        samples: rendered,
        sample_rate: main.sample_rate,
    };
    write_mono(&config.output_path, &output)?;
    info!(
        "Rendered {:.2}s to {} ({} combine cycles)",
        output.duration_secs(),
        config.output_path.display(),
        stats.combine_cycles
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clamps_to_clip() {
        let clip = MonoClip {
            samples: vec![1.0, 2.0, 3.0, 4.0],
            sample_rate: 8000,
        };
        assert_eq!(clip.window(1, 2), &[2.0, 3.0]);
        assert_eq!(clip.window(3, 10), &[4.0]);
        assert!(clip.window(10, 4).is_empty());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_mono(Path::new("does/not/exist.wav")).unwrap_err();
        assert!(matches!(err, AudioError::Wav { .. }));
        assert!(err.to_string().contains("exist.wav"));
    }
}
