//! Live playback of main/sidechain files through the processor.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::error::{AudioError, AudioResult};
use super::monitor::{error_ring, push_recorded, PlaybackMonitor, PlaybackState, Recorder};
use super::processor::{CrossSynthProcessor, ProcessorStats, StatsSnapshot};
use super::wav::load_inputs;
use crate::params::{PlaybackConfig, SpectralConfig};

/// Hard limit on device output; unnormalized magnitude products can get loud
const OUTPUT_LIMIT: f32 = 0.5;

/// Audio system streaming processed audio to the default output device
pub struct PlaybackSystem {
    /// Counters updated by the audio callback
    stats: Arc<ProcessorStats>,

    /// Ends playback once every frame is played or the stream fails
    monitor: PlaybackMonitor,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,
}

impl PlaybackSystem {
    /// Load the inputs, open the default device and start playback
    pub fn new(config: &PlaybackConfig, spectral: SpectralConfig) -> AudioResult<Self> {
        let (main, sidechain) = load_inputs(&config.main_path, config.sidechain_path.as_deref())?;
        let sample_rate = main.sample_rate;

        let mut processor = CrossSynthProcessor::new(spectral);
        processor.prepare(f64::from(sample_rate), config.max_block_size)?;
        let stats = processor.stats_handle();
        let total_frames = main.samples.len() + processor.latency_samples();

        // Setup audio output device
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevices)?;

        let default_config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;
        let channels = usize::from(default_config.channels());
        let stream_config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        info!(
            "Audio: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels
        );

        // Recording goes through a lock-free ring so the callback never touches the file
        let (mut producer, recorder) = match &config.record_path {
            Some(path) => {
                let (producer, recorder) =
                    Recorder::create(path, sample_rate, config.record_capacity(sample_rate))?;
                (Some(producer), Some(recorder))
            }
            None => (None, None),
        };

        let state = Arc::new(PlaybackState::default());
        let callback_state = Arc::clone(&state);
        let (mut error_producer, errors) = error_ring();
        let mut scratch = vec![0.0f32; config.max_block_size];
        let mut position = 0usize;

        // Build audio output stream
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames_needed = data.len() / channels;
                    let mut frame_idx = 0;

                    // Split oversized callbacks into blocks the processor was prepared for
                    while frame_idx < frames_needed {
                        let frames = (frames_needed - frame_idx).min(scratch.len());
                        let block = &mut scratch[..frames];

                        let main_block = main.window(position, frames);
                        let sidechain_block =
                            sidechain.as_ref().map(|clip| clip.window(position, frames));
                        processor.process_block(main_block, sidechain_block, block);

                        for (i, sample) in block.iter_mut().enumerate() {
                            *sample = sample.clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT);
                            let out_idx = (frame_idx + i) * channels;
                            data[out_idx..out_idx + channels].fill(*sample);
                        }
                        if let Some(producer) = producer.as_mut() {
                            callback_state.add_lost_record_samples(push_recorded(producer, block));
                        }

                        position += frames;
                        frame_idx += frames;
                    }

                    if position >= total_frames {
                        callback_state.mark_finished();
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    // One queued error is enough to stop the monitor
                    let _ = error_producer.push(err.to_string());
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        Ok(Self {
            stats,
            monitor: PlaybackMonitor::new(
                state,
                errors,
                recorder,
                Duration::from_millis(config.poll_interval_ms),
            ),
            _stream: stream,
        })
    }

    /// Current processor counters (thread-safe)
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.monitor.is_finished()
    }

    /// Block until playback ends or the stream fails, draining the recorder meanwhile
    pub fn wait(self) -> AudioResult<StatsSnapshot> {
        let Self {
            stats,
            monitor,
            _stream: stream,
        } = self;
        monitor.run()?;
        drop(stream);

        let stats = stats.snapshot();
        if stats.dropped_blocks > 0 {
            warn!("{} blocks dropped during playback", stats.dropped_blocks);
        }
        Ok(stats)
    }
}
