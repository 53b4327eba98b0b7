//! Block processor: accumulation, transform-and-combine, output hand-off.
//!
//! The host calls [`CrossSynthProcessor::process_block`] once per audio
//! callback with any number of frames. Samples are pushed one frame at a time
//! into the main and sidechain accumulators; as soon as both hold a complete
//! block the combine cycle runs, possibly partway through a callback, and the
//! reconstructed block replaces the output buffer for the frames that follow.
//!
//! Output frame `t` reads position `t mod fft_size` of the most recently
//! reconstructed block, so the processor has a fixed latency of one block.
//! Before the first cycle completes the output is silence.

use log::{debug, info, warn};
use rustfft::{num_complex::Complex32, FftPlanner};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::cross::combine_in_place;
use super::error::TransformError;
use super::fft::{load_real, real_part, SpectralTransform};
use super::fifo::{FifoAccumulator, PushOutcome};
use crate::params::{CombineMode, ConfigError, SpectralConfig};

/// Which input stream a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Main,
    Sidechain,
}

/// Counters shared with non-real-time observers
#[derive(Debug, Default)]
pub struct ProcessorStats {
    combine_cycles: AtomicU64,
    dropped_blocks: AtomicU64,
    failed_cycles: AtomicU64,
    frames_processed: AtomicU64,
}

/// Point-in-time copy of [`ProcessorStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub combine_cycles: u64,
    pub dropped_blocks: u64,
    pub failed_cycles: u64,
    pub frames_processed: u64,
}

impl ProcessorStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            combine_cycles: self.combine_cycles.load(Ordering::Relaxed),
            dropped_blocks: self.dropped_blocks.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
        }
    }

    fn record(&self, block: StatsSnapshot) {
        self.combine_cycles
            .fetch_add(block.combine_cycles, Ordering::Relaxed);
        self.dropped_blocks
            .fetch_add(block.dropped_blocks, Ordering::Relaxed);
        self.failed_cycles
            .fetch_add(block.failed_cycles, Ordering::Relaxed);
        self.frames_processed
            .fetch_add(block.frames_processed, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.combine_cycles.store(0, Ordering::Relaxed);
        self.dropped_blocks.store(0, Ordering::Relaxed);
        self.failed_cycles.store(0, Ordering::Relaxed);
        self.frames_processed.store(0, Ordering::Relaxed);
    }
}

/// All buffers of one prepared stream, allocated once
pub struct ProcessingContext {
    fft_size: usize,
    mode: CombineMode,
    main: FifoAccumulator,
    sidechain: FifoAccumulator,
    main_transform: SpectralTransform,
    sidechain_transform: SpectralTransform,
    main_spectrum: Vec<Complex32>,
    sidechain_spectrum: Vec<Complex32>,
    output: Vec<f32>,
}

impl ProcessingContext {
    pub fn new(config: &SpectralConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let fft_size = config.fft_size();
        let mut planner = FftPlanner::new();
        let context = Self {
            fft_size,
            mode: config.combine_mode,
            main: FifoAccumulator::new(fft_size),
            sidechain: FifoAccumulator::new(fft_size),
            main_transform: SpectralTransform::with_planner(&mut planner, fft_size),
            sidechain_transform: SpectralTransform::with_planner(&mut planner, fft_size),
            main_spectrum: vec![Complex32::new(0.0, 0.0); fft_size],
            sidechain_spectrum: vec![Complex32::new(0.0, 0.0); fft_size],
            output: vec![0.0; fft_size],
        };
        context.check_capacities()?;
        Ok(context)
    }

    fn check_capacities(&self) -> Result<(), ConfigError> {
        check_capacities(
            self.fft_size,
            &[
                ("main fifo", self.main.capacity()),
                ("sidechain fifo", self.sidechain.capacity()),
                ("main transform", self.main_transform.size()),
                ("sidechain transform", self.sidechain_transform.size()),
                ("main spectrum", self.main_spectrum.len()),
                ("sidechain spectrum", self.sidechain_spectrum.len()),
                ("output", self.output.len()),
            ],
        )
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn mode(&self) -> CombineMode {
        self.mode
    }

    pub fn accumulator(&self, role: ChannelRole) -> &FifoAccumulator {
        match role {
            ChannelRole::Main => &self.main,
            ChannelRole::Sidechain => &self.sidechain,
        }
    }

    /// Push one sample into the accumulator for `role`
    pub fn push(&mut self, role: ChannelRole, sample: f32) -> PushOutcome {
        match role {
            ChannelRole::Main => self.main.push(sample),
            ChannelRole::Sidechain => self.sidechain.push(sample),
        }
    }

    /// Every input the current mode reads holds a committed block
    pub fn is_ready(&self) -> bool {
        let main_ready = self.main.slot().is_full();
        if self.mode.requires_sidechain() {
            main_ready && self.sidechain.slot().is_full()
        } else {
            main_ready
        }
    }

    /// Sample of the current reconstruction at the next write position
    pub fn output_sample(&self) -> f32 {
        self.output[self.main.cursor()]
    }

    /// Last reconstructed block
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// Run transform → combine → inverse if ready.
    ///
    /// Returns `Ok(false)` without side effects when not every input is ready.
    /// Both slots are released once the cycle ends, successful or not.
    pub fn run_cycle(&mut self) -> Result<bool, TransformError> {
        if !self.is_ready() {
            return Ok(false);
        }

        let outcome = self.transform_and_combine();
        self.main.slot().release();
        self.sidechain.slot().release();
        outcome.map(|()| true)
    }

    fn transform_and_combine(&mut self) -> Result<(), TransformError> {
        if let Some(block) = self.main.slot().begin_consume() {
            load_real(block, &mut self.main_spectrum);
        }
        self.main_transform.forward(&mut self.main_spectrum)?;

        if self.mode == CombineMode::CrossSynthesis {
            if let Some(block) = self.sidechain.slot().begin_consume() {
                load_real(block, &mut self.sidechain_spectrum);
            }
            self.sidechain_transform
                .forward(&mut self.sidechain_spectrum)?;
            combine_in_place(&mut self.main_spectrum, &self.sidechain_spectrum)?;
        }

        self.main_transform.inverse(&mut self.main_spectrum)?;
        real_part(&self.main_spectrum, &mut self.output);
        Ok(())
    }

    /// Advance one frame: emit, accumulate, combine if ready
    fn process_frame(&mut self, main: f32, sidechain: f32, counts: &mut StatsSnapshot) -> f32 {
        let out = self.output_sample();

        if self.push(ChannelRole::Main, main) == PushOutcome::Dropped {
            counts.dropped_blocks += 1;
        }
        if self.mode.requires_sidechain() {
            if self.push(ChannelRole::Sidechain, sidechain) == PushOutcome::Dropped {
                counts.dropped_blocks += 1;
            }
            debug_assert_eq!(self.main.cursor(), self.sidechain.cursor());
        }

        match self.run_cycle() {
            Ok(true) => counts.combine_cycles += 1,
            Ok(false) => {}
            Err(_) => counts.failed_cycles += 1,
        }
        out
    }

    pub fn reset(&mut self) {
        self.main.reset();
        self.sidechain.reset();
        self.main_spectrum.fill(Complex32::new(0.0, 0.0));
        self.sidechain_spectrum.fill(Complex32::new(0.0, 0.0));
        self.output.fill(0.0);
    }
}

/// Spectral cross-synthesis processor driven by host callbacks
pub struct CrossSynthProcessor {
    config: SpectralConfig,
    context: Option<ProcessingContext>,
    stats: Arc<ProcessorStats>,
}

impl CrossSynthProcessor {
    pub fn new(config: SpectralConfig) -> Self {
        Self {
            config,
            context: None,
            stats: Arc::new(ProcessorStats::default()),
        }
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    /// Allocate every buffer for a stream at `sample_rate`.
    ///
    /// On error the processor stays unprepared and passes audio through.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<(), ConfigError> {
        self.context = None;

        if sample_rate.is_nan() || sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        if max_block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }

        let context = ProcessingContext::new(&self.config)?;
        info!(
            "Spectral engine: {:?}, fft_size {} ({:.1}ms @ {}Hz), host blocks up to {} frames",
            context.mode(),
            context.fft_size(),
            self.config.block_duration_ms(sample_rate),
            sample_rate,
            max_block_size
        );

        self.stats.reset();
        self.context = Some(context);
        Ok(())
    }

    /// Free stream buffers; processing falls back to pass-through
    pub fn release(&mut self) {
        if self.context.take().is_none() {
            return;
        }

        let stats = self.stats.snapshot();
        if stats.dropped_blocks > 0 {
            warn!(
                "{} blocks dropped while the combine cycle was behind",
                stats.dropped_blocks
            );
        }
        if stats.failed_cycles > 0 {
            warn!("{} combine cycles failed", stats.failed_cycles);
        }
        debug!(
            "Released after {} frames, {} combine cycles",
            stats.frames_processed, stats.combine_cycles
        );
    }

    pub fn is_prepared(&self) -> bool {
        self.context.is_some()
    }

    /// Output delay in frames (one transform block when prepared)
    pub fn latency_samples(&self) -> usize {
        self.context.as_ref().map_or(0, ProcessingContext::fft_size)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Shared counters, readable from another thread while streaming
    pub fn stats_handle(&self) -> Arc<ProcessorStats> {
        Arc::clone(&self.stats)
    }

    /// Process one host callback of `output.len()` frames.
    ///
    /// `main` and `sidechain` shorter than `output` (or a missing sidechain)
    /// are padded with silence. Never allocates or blocks.
    pub fn process_block(&mut self, main: &[f32], sidechain: Option<&[f32]>, output: &mut [f32]) {
        let Some(context) = self.context.as_mut() else {
            pass_through(main, output);
            return;
        };

        let mut counts = StatsSnapshot {
            frames_processed: output.len() as u64,
            ..StatsSnapshot::default()
        };

        for (frame, out) in output.iter_mut().enumerate() {
            let main_sample = main.get(frame).copied().unwrap_or(0.0);
            let sidechain_sample = sidechain
                .and_then(|samples| samples.get(frame))
                .copied()
                .unwrap_or(0.0);

            *out = context.process_frame(main_sample, sidechain_sample, &mut counts);
        }

        self.stats.record(counts);
    }
}

/// Every per-stream buffer must hold exactly one block, since the frame
/// loop indexes them all by the accumulator cursor.
fn check_capacities(
    fft_size: usize,
    buffers: &[(&'static str, usize)],
) -> Result<(), ConfigError> {
    for &(buffer, actual) in buffers {
        if actual != fft_size {
            return Err(ConfigError::CapacityMismatch {
                buffer,
                expected: fft_size,
                actual,
            });
        }
    }
    Ok(())
}

fn pass_through(input: &[f32], output: &mut [f32]) {
    let frames = input.len().min(output.len());
    output[..frames].copy_from_slice(&input[..frames]);
    output[frames..].fill(0.0);
}
