//! FFT processing with windowing

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, warn};
use num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};

use super::stats::{bin_frequency, frequency_bin, peak_amplitude, rms};
use super::windows::{WindowLibrary, WindowType};

/// One analysis block: clipped dB half-spectrum plus the raw samples it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    /// Magnitude spectrum in dB, `fft_size / 2` bins
    pub magnitudes_db: Vec<f32>,
    /// Unwindowed time-domain samples, `fft_size` long
    pub time_domain: Vec<f32>,
    /// Peak absolute sample value
    pub peak: f32,
    /// RMS of the time-domain block
    pub rms: f32,
}

impl SpectralFrame {
    /// Build a frame from an existing spectrum, deriving peak and RMS from the samples
    pub fn new(magnitudes_db: Vec<f32>, time_domain: Vec<f32>) -> Self {
        let peak = peak_amplitude(&time_domain);
        let rms = rms(&time_domain);
        Self {
            magnitudes_db,
            time_domain,
            peak,
            rms,
        }
    }

    /// Loudest bin in dB
    pub fn max_db(&self) -> f32 {
        self.magnitudes_db.iter().copied().fold(f32::MIN, f32::max)
    }
}

/// Windowed real FFT of a fixed block size with a bounded spectrogram history
pub struct SpectralTransformStage {
    planner: RealFftPlanner<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
    windows: WindowLibrary,
    window_type: WindowType,
    fft_size: usize,
    sample_rate: u32,
    min_db: f32,
    max_db: f32,
    input: Vec<f32>,
    output: Vec<Complex32>,
    scratch: Vec<Complex32>,
    spectrogram: VecDeque<Vec<f32>>,
}

impl SpectralTransformStage {
    /// Frames retained in the rolling spectrogram
    pub const SPECTROGRAM_CAPACITY: usize = 1000;

    /// `fft_size` must be non-zero and even; configuration validation enforces this.
    pub fn new(
        fft_size: usize,
        window_type: WindowType,
        sample_rate: u32,
        min_db: f32,
        max_db: f32,
    ) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let input = fft.make_input_vec();
        let output = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        Self {
            planner,
            fft,
            windows: WindowLibrary::new(fft_size),
            window_type,
            fft_size,
            sample_rate,
            min_db,
            max_db,
            input,
            output,
            scratch,
            spectrogram: VecDeque::with_capacity(Self::SPECTROGRAM_CAPACITY),
        }
    }

    /// Transform the most recent `fft_size` samples of `samples`.
    ///
    /// Shorter input is zero-padded at the front so the newest sample stays
    /// at the end of the block.
    pub fn transform(&mut self, samples: &[f32]) -> SpectralFrame {
        let n = self.fft_size;
        let mut time_domain = vec![0.0f32; n];
        let take = samples.len().min(n);
        time_domain[n - take..].copy_from_slice(&samples[samples.len() - take..]);

        let window = self.windows.get(self.window_type);
        for ((slot, &s), &w) in self.input.iter_mut().zip(&time_domain).zip(window) {
            *slot = s * w;
        }

        let magnitudes_db = match self
            .fft
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
        {
            Ok(()) => {
                let scale = n as f32;
                self.output[..n / 2]
                    .iter()
                    .map(|c| {
                        let magnitude = c.norm() / scale;
                        let db = if magnitude > 1e-10 {
                            20.0 * magnitude.log10()
                        } else {
                            self.min_db
                        };
                        db.clamp(self.min_db, self.max_db)
                    })
                    .collect()
            }
            Err(e) => {
                warn!("FFT failed, reporting silence: {}", e);
                vec![self.min_db; n / 2]
            }
        };

        SpectralFrame::new(magnitudes_db, time_domain)
    }

    /// Frame produced when no audio is available
    pub fn silent_frame(&self) -> SpectralFrame {
        SpectralFrame::new(vec![self.min_db; self.bin_count()], vec![0.0; self.fft_size])
    }

    /// Append a spectrum to the rolling spectrogram, evicting the oldest on overflow
    pub fn record(&mut self, magnitudes_db: &[f32]) {
        if self.spectrogram.len() == Self::SPECTROGRAM_CAPACITY {
            self.spectrogram.pop_front();
        }
        self.spectrogram.push_back(magnitudes_db.to_vec());
    }

    pub fn spectrogram(&self) -> &VecDeque<Vec<f32>> {
        &self.spectrogram
    }

    pub fn clear_spectrogram(&mut self) {
        self.spectrogram.clear();
    }

    /// Reallocate every buffer and regenerate the windows for a new block size.
    ///
    /// The spectrogram is cleared since its rows no longer match the bin count.
    pub fn set_fft_size(&mut self, fft_size: usize) {
        if fft_size == self.fft_size {
            return;
        }
        debug!("Reallocating transform buffers: {} -> {}", self.fft_size, fft_size);

        self.fft = self.planner.plan_fft_forward(fft_size);
        self.input = self.fft.make_input_vec();
        self.output = self.fft.make_output_vec();
        self.scratch = self.fft.make_scratch_vec();
        self.windows.resize(fft_size);
        self.fft_size = fft_size;
        self.spectrogram.clear();
    }

    pub fn set_window(&mut self, window_type: WindowType) {
        self.window_type = window_type;
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_db_range(&mut self, min_db: f32, max_db: f32) {
        self.min_db = min_db;
        self.max_db = max_db;
    }

    pub fn frequency_of_bin(&self, bin: usize) -> f32 {
        bin_frequency(bin, self.sample_rate, self.fft_size)
    }

    pub fn bin_of_frequency(&self, freq: f32) -> usize {
        frequency_bin(freq, self.sample_rate, self.fft_size)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
