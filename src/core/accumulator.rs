// src/core/accumulator.rs
//
// Bounded buffers between the per-frame voice decision and segment
// classification.

use std::collections::VecDeque;

/// Capped FIFO of voice/silence decisions
#[derive(Debug, Clone)]
pub struct VoiceHistory {
    entries: VecDeque<bool>,
    capacity: usize,
}

impl VoiceHistory {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a decision, evicting the oldest once full
    pub fn push(&mut self, is_voice: bool) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(is_voice);
    }

    /// Fraction of retained decisions that were voice; 0 when empty
    pub fn activity_rate(&self) -> f32 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let voiced = self.entries.iter().filter(|&&v| v).count();
        voiced as f32 / self.entries.len() as f32
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.entries.iter().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for VoiceHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Accumulator state after a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    /// Fewer than `capacity` voice frames buffered
    Collecting,
    /// Buffer full; the caller must take the frames before the next push
    Ready,
}

/// Buffers consecutive voice frames in non-overlapping windows
#[derive(Debug, Clone)]
pub struct DetectionAccumulator {
    frames: Vec<Vec<f32>>,
    capacity: usize,
    history: VoiceHistory,
}

impl DetectionAccumulator {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(capacity: usize, history_capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            history: VoiceHistory::new(history_capacity),
        }
    }

    /// Record a decision. Voice frames are buffered; silence only reaches the history.
    pub fn push(&mut self, is_voice: bool, spectrum_db: &[f32]) -> AccumulatorState {
        self.history.push(is_voice);
        if is_voice && self.frames.len() < self.capacity {
            self.frames.push(spectrum_db.to_vec());
        }
        self.state()
    }

    /// Hand over every buffered frame, leaving the accumulator empty
    pub fn take_frames(&mut self) -> Vec<Vec<f32>> {
        std::mem::replace(&mut self.frames, Vec::with_capacity(self.capacity))
    }

    pub fn state(&self) -> AccumulatorState {
        if self.frames.len() >= self.capacity {
            AccumulatorState::Ready
        } else {
            AccumulatorState::Collecting
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn history(&self) -> &VoiceHistory {
        &self.history
    }

    pub fn voice_activity_rate(&self) -> f32 {
        self.history.activity_rate()
    }

    /// Drop buffered frames, keeping the history
    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }

    /// Drop frames and history
    pub fn reset(&mut self) {
        self.frames.clear();
        self.history.clear();
    }
}

impl Default for DetectionAccumulator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, VoiceHistory::DEFAULT_CAPACITY)
    }
}
