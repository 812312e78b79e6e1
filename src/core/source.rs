// src/core/source.rs
//
// Pull-based audio input. The engine asks for the most recent block on
// every tick; it never owns capture or mixing.

/// Provider of the most recent time-domain block
pub trait AudioSource {
    /// Fill `buffer` with the newest `buffer.len()` samples, oldest first.
    ///
    /// Returns `false` when no audio is available; the buffer contents are
    /// then unspecified and the caller treats the tick as silence.
    fn pull(&mut self, buffer: &mut [f32]) -> bool;

    fn sample_rate(&self) -> u32;
}

/// In-memory signal read as a stream, advancing `hop` samples per pull
#[derive(Debug, Clone)]
pub struct SampleBufferSource {
    samples: Vec<f32>,
    sample_rate: u32,
    hop: usize,
    position: usize,
}

impl SampleBufferSource {
    pub fn new(samples: Vec<f32>, sample_rate: u32, hop: usize) -> Self {
        Self {
            samples,
            sample_rate,
            hop: hop.max(1),
            position: 0,
        }
    }

    /// Number of pulls needed to walk the whole signal
    pub fn tick_count(&self) -> usize {
        self.samples.len().div_ceil(self.hop)
    }

    /// Stream position in milliseconds
    pub fn position_ms(&self) -> i64 {
        (self.position as u64 * 1000 / self.sample_rate.max(1) as u64) as i64
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl AudioSource for SampleBufferSource {
    fn pull(&mut self, buffer: &mut [f32]) -> bool {
        if self.is_exhausted() {
            return false;
        }

        self.position = (self.position + self.hop).min(self.samples.len());

        let n = buffer.len();
        let take = self.position.min(n);
        let pad = n - take;
        buffer[..pad].fill(0.0);
        buffer[pad..].copy_from_slice(&self.samples[self.position - take..self.position]);
        true
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
