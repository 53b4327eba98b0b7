//! Sample accumulation and single-slot block hand-off.
//!
//! Each input stream owns a [`FifoAccumulator`] that collects samples until a
//! full transform block is available, then commits it into a [`BlockSlot`].
//! The slot holds at most one block: while it is `Full` or `Consuming`, newly
//! completed blocks are discarded and the oldest unconsumed block is kept.

use std::sync::atomic::{AtomicU8, Ordering};

const EMPTY: u8 = 0;
const FULL: u8 = 1;
const CONSUMING: u8 = 2;

/// Hand-off state of a [`BlockSlot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No block waiting, the next commit is accepted
    Empty,
    /// A committed block is waiting for the combine cycle
    Full,
    /// The combine cycle is reading the snapshot
    Consuming,
}

impl SlotState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            EMPTY => Self::Empty,
            FULL => Self::Full,
            _ => Self::Consuming,
        }
    }
}

/// Single-slot channel between an accumulator and the combine cycle
#[derive(Debug)]
pub struct BlockSlot {
    state: AtomicU8,
    snapshot: Vec<f32>,
}

impl BlockSlot {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            snapshot: vec![0.0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.snapshot.len()
    }

    pub fn state(&self) -> SlotState {
        SlotState::from_raw(self.state.load(Ordering::SeqCst))
    }

    pub fn is_full(&self) -> bool {
        self.state() == SlotState::Full
    }

    /// Last committed block (zeros before the first commit)
    pub fn snapshot(&self) -> &[f32] {
        &self.snapshot
    }

    /// Copy `block` into the snapshot if the slot is empty.
    ///
    /// Returns `false` and leaves the snapshot untouched otherwise.
    pub fn try_fill(&mut self, block: &[f32]) -> bool {
        debug_assert_eq!(block.len(), self.snapshot.len());
        if self.state.load(Ordering::SeqCst) != EMPTY {
            return false;
        }
        self.snapshot.copy_from_slice(block);
        self.state.store(FULL, Ordering::SeqCst);
        true
    }

    /// Move `Full → Consuming` and hand out the snapshot
    pub fn begin_consume(&self) -> Option<&[f32]> {
        self.state
            .compare_exchange(FULL, CONSUMING, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| self.snapshot.as_slice())
    }

    /// Move `Consuming → Empty`; no effect in any other state
    pub fn release(&self) {
        let _ = self
            .state
            .compare_exchange(CONSUMING, EMPTY, Ordering::SeqCst, Ordering::SeqCst);
    }

    pub fn reset(&mut self) {
        self.snapshot.fill(0.0);
        self.state.store(EMPTY, Ordering::SeqCst);
    }
}

/// Result of pushing one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Block not complete yet
    Pending,
    /// Block complete and committed to the slot
    Committed,
    /// Block complete but the slot was occupied; samples discarded
    Dropped,
}

/// Fixed-capacity sample accumulator for one input stream
#[derive(Debug)]
pub struct FifoAccumulator {
    buffer: Vec<f32>,
    /// Next write position, always < capacity between pushes
    cursor: usize,
    slot: BlockSlot,
    dropped_blocks: u64,
}

impl FifoAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            cursor: 0,
            slot: BlockSlot::new(capacity),
            dropped_blocks: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn slot(&self) -> &BlockSlot {
        &self.slot
    }

    /// Blocks discarded because the slot was still occupied
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped_blocks
    }

    /// Append one sample. Constant time, never allocates.
    pub fn push(&mut self, sample: f32) -> PushOutcome {
        self.buffer[self.cursor] = sample;
        self.cursor += 1;
        if self.cursor < self.buffer.len() {
            return PushOutcome::Pending;
        }

        self.cursor = 0;
        if self.slot.try_fill(&self.buffer) {
            PushOutcome::Committed
        } else {
            self.dropped_blocks += 1;
            PushOutcome::Dropped
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.cursor = 0;
        self.slot.reset();
        self.dropped_blocks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: usize = 256;

    fn push_ramp(fifo: &mut FifoAccumulator, start: usize, count: usize) -> Vec<PushOutcome> {
        (start..start + count)
            .map(|i| fifo.push(i as f32))
            .collect()
    }

    #[test]
    fn test_partial_block_never_commits() {
        let mut fifo = FifoAccumulator::new(SIZE);
        let outcomes = push_ramp(&mut fifo, 0, SIZE - 1);

        assert!(outcomes.iter().all(|&o| o == PushOutcome::Pending));
        assert_eq!(fifo.slot().state(), SlotState::Empty);
        assert_eq!(fifo.cursor(), SIZE - 1);
    }

    #[test]
    fn test_full_block_commits_once_in_order() {
        let mut fifo = FifoAccumulator::new(SIZE);
        let outcomes = push_ramp(&mut fifo, 0, SIZE);

        let commits = outcomes
            .iter()
            .filter(|&&o| o == PushOutcome::Committed)
            .count();
        assert_eq!(commits, 1);
        assert_eq!(outcomes[SIZE - 1], PushOutcome::Committed);
        assert_eq!(fifo.slot().state(), SlotState::Full);
        assert_eq!(fifo.cursor(), 0);

        let expected: Vec<f32> = (0..SIZE).map(|i| i as f32).collect();
        assert_eq!(fifo.slot().snapshot(), expected.as_slice());
    }

    #[test]
    fn test_backpressure_keeps_first_block() {
        let mut fifo = FifoAccumulator::new(SIZE);
        push_ramp(&mut fifo, 0, SIZE);
        let second = push_ramp(&mut fifo, SIZE, SIZE);

        assert_eq!(second[SIZE - 1], PushOutcome::Dropped);
        assert_eq!(fifo.dropped_blocks(), 1);
        assert_eq!(fifo.slot().state(), SlotState::Full);
        assert_eq!(fifo.cursor(), 0);

        // First snapshot intact
        assert_eq!(fifo.slot().snapshot()[0], 0.0);
        assert_eq!(fifo.slot().snapshot()[SIZE - 1], (SIZE - 1) as f32);
    }

    #[test]
    fn test_commit_resumes_after_release() {
        let mut fifo = FifoAccumulator::new(SIZE);
        push_ramp(&mut fifo, 0, SIZE);

        assert!(fifo.slot().begin_consume().is_some());
        assert_eq!(fifo.slot().state(), SlotState::Consuming);
        fifo.slot().release();
        assert_eq!(fifo.slot().state(), SlotState::Empty);

        let outcomes = push_ramp(&mut fifo, SIZE, SIZE);
        assert_eq!(outcomes[SIZE - 1], PushOutcome::Committed);
        assert_eq!(fifo.slot().snapshot()[0], SIZE as f32);
    }

    #[test]
    fn test_slot_refuses_fill_while_consuming() {
        let mut slot = BlockSlot::new(4);
        assert!(slot.begin_consume().is_none());

        assert!(slot.try_fill(&[1.0, 2.0, 3.0, 4.0]));
        assert!(slot.begin_consume().is_some());
        assert!(!slot.try_fill(&[9.0; 4]));
        assert_eq!(slot.snapshot(), &[1.0, 2.0, 3.0, 4.0]);

        // Release only acts on a consuming slot
        slot.release();
        slot.release();
        assert_eq!(slot.state(), SlotState::Empty);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut fifo = FifoAccumulator::new(SIZE);
        push_ramp(&mut fifo, 0, SIZE + 10);
        fifo.reset();

        assert_eq!(fifo.cursor(), 0);
        assert_eq!(fifo.slot().state(), SlotState::Empty);
        assert!(fifo.slot().snapshot().iter().all(|&s| s == 0.0));
    }
}
