//! Control-thread side of live playback.
//!
//! The stream callbacks only touch atomics and `rtrb` rings. The monitor
//! polls them, drains the recording ring into a WAV file and decides when
//! playback is over: either every frame was played or the stream reported
//! an error.

use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::error::{AudioError, AudioResult};

/// Stream errors kept for the control thread; later ones are only logged
const ERROR_RING_CAPACITY: usize = 4;

/// Flags and counters shared with the stream callbacks
#[derive(Debug, Default)]
pub(crate) struct PlaybackState {
    finished: AtomicBool,
    lost_record_samples: AtomicU64,
}

impl PlaybackState {
    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn add_lost_record_samples(&self, count: u64) {
        if count > 0 {
            self.lost_record_samples.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn lost_record_samples(&self) -> u64 {
        self.lost_record_samples.load(Ordering::Relaxed)
    }
}

/// Error channel between the stream's error callback and the monitor
pub(crate) fn error_ring() -> (rtrb::Producer<String>, rtrb::Consumer<String>) {
    rtrb::RingBuffer::new(ERROR_RING_CAPACITY)
}

/// Push `block` into the recording ring, returning how many samples did not fit
pub(crate) fn push_recorded(producer: &mut rtrb::Producer<f32>, block: &[f32]) -> u64 {
    let mut lost = 0;
    for &sample in block {
        if producer.push(sample).is_err() {
            lost += 1;
        }
    }
    lost
}

/// Drains processed samples from the audio thread into a WAV file
pub(crate) struct Recorder {
    path: PathBuf,
    consumer: rtrb::Consumer<f32>,
    writer: hound::WavWriter<BufWriter<File>>,
}

impl Recorder {
    /// Create the mono float WAV at `path` and the ring feeding it
    pub(crate) fn create(
        path: &Path,
        sample_rate: u32,
        capacity: usize,
    ) -> AudioResult<(rtrb::Producer<f32>, Self)> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(path, spec).map_err(|source| AudioError::Wav {
            path: path.to_path_buf(),
            source,
        })?;
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);

        Ok((
            producer,
            Self {
                path: path.to_path_buf(),
                consumer,
                writer,
            },
        ))
    }

    fn drain(&mut self) -> AudioResult<()> {
        while let Ok(sample) = self.consumer.pop() {
            self.writer
                .write_sample(sample)
                .map_err(|source| AudioError::Wav {
                    path: self.path.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    fn finish(mut self) -> AudioResult<()> {
        self.drain()?;
        let path = self.path;
        self.writer
            .finalize()
            .map_err(|source| AudioError::Wav { path, source })
    }
}

/// Waits for playback to end on the control thread
pub(crate) struct PlaybackMonitor {
    state: Arc<PlaybackState>,
    errors: rtrb::Consumer<String>,
    recorder: Option<Recorder>,
    poll_interval: Duration,
}

impl PlaybackMonitor {
    pub(crate) fn new(
        state: Arc<PlaybackState>,
        errors: rtrb::Consumer<String>,
        recorder: Option<Recorder>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            state,
            errors,
            recorder,
            poll_interval,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Block until every frame is played or the stream fails.
    ///
    /// The recording is finalized on both paths. A stream error takes
    /// precedence over a recorder error.
    pub(crate) fn run(mut self) -> AudioResult<()> {
        let outcome = self.poll();
        let recorded = self.finish_recording();
        outcome.and(recorded)
    }

    fn poll(&mut self) -> AudioResult<()> {
        loop {
            if let Ok(message) = self.errors.pop() {
                return Err(AudioError::StreamPlayError(message));
            }
            if self.state.is_finished() {
                return Ok(());
            }

            thread::sleep(self.poll_interval);
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.drain()?;
            }
        }
    }

    fn finish_recording(&mut self) -> AudioResult<()> {
        let Some(recorder) = self.recorder.take() else {
            return Ok(());
        };

        let path = recorder.path.clone();
        recorder.finish()?;

        let lost = self.state.lost_record_samples();
        if lost > 0 {
            warn!(
                "Recorded output to {} with {} samples lost to a full ring",
                path.display(),
                lost
            );
        } else {
            info!("Recorded output to {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::read_mono;

    const POLL: Duration = Duration::from_millis(1);

    #[test]
    fn test_finished_playback_returns_ok() {
        let state = Arc::new(PlaybackState::default());
        let (_errors_tx, errors) = error_ring();
        state.mark_finished();

        let monitor = PlaybackMonitor::new(Arc::clone(&state), errors, None, POLL);
        assert!(monitor.is_finished());
        assert!(monitor.run().is_ok());
    }

    #[test]
    fn test_stream_error_ends_wait_and_keeps_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.wav");

        let state = Arc::new(PlaybackState::default());
        let (mut errors_tx, errors) = error_ring();
        let (mut samples, recorder) = Recorder::create(&path, 44100, 64).unwrap();

        assert_eq!(push_recorded(&mut samples, &[0.1, 0.2, 0.3]), 0);
        // The data callback never finishes; only the error callback fires
        let failing = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            errors_tx.push("device disconnected".to_string()).unwrap();
        });

        let monitor = PlaybackMonitor::new(Arc::clone(&state), errors, Some(recorder), POLL);
        let err = monitor.run().unwrap_err();
        failing.join().unwrap();

        assert!(
            matches!(err, AudioError::StreamPlayError(ref message) if message == "device disconnected")
        );
        assert!(!state.is_finished());

        let clip = read_mono(&path).unwrap();
        assert_eq!(clip.samples, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_full_ring_counts_lost_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.wav");

        let state = Arc::new(PlaybackState::default());
        let (_errors_tx, errors) = error_ring();
        let (mut samples, recorder) = Recorder::create(&path, 44100, 4).unwrap();

        let lost = push_recorded(&mut samples, &[0.5; 10]);
        assert_eq!(lost, 6);
        state.add_lost_record_samples(lost);
        assert_eq!(state.lost_record_samples(), 6);

        state.mark_finished();
        PlaybackMonitor::new(Arc::clone(&state), errors, Some(recorder), POLL)
            .run()
            .unwrap();

        let clip = read_mono(&path).unwrap();
        assert_eq!(clip.samples.len(), 4);
    }
}
