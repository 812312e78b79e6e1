// src/core/analysis/mfcc.rs
//
// Simplified MFCC: triangular mel filter bank over the linear magnitude
// spectrum, log energies, DCT-II. No pre-emphasis and no liftering.

use std::f32::consts::PI;

use crate::core::dsp::stats::{frequency_bin, EPSILON};

/// MFCC analysis parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MfccParams {
    pub num_coefficients: usize,
    pub num_mel_bands: usize,
}

impl Default for MfccParams {
    fn default() -> Self {
        Self {
            num_coefficients: 13,
            num_mel_bands: 26,
        }
    }
}

pub fn hz_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

#[derive(Debug, Clone)]
struct MelFilter {
    start_bin: usize,
    weights: Vec<f32>,
}

/// Triangular filters evenly spaced on the mel scale from 0 Hz to Nyquist
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    filters: Vec<MelFilter>,
    num_bins: usize,
    sample_rate: u32,
}

impl MelFilterBank {
    pub fn new(num_filters: usize, num_bins: usize, sample_rate: u32) -> Self {
        let fft_size = num_bins * 2;
        let max_mel = hz_to_mel(sample_rate as f32 / 2.0);
        let last_bin = num_bins.saturating_sub(1);

        let edges: Vec<usize> = (0..num_filters + 2)
            .map(|i| {
                let mel = max_mel * i as f32 / (num_filters + 1) as f32;
                frequency_bin(mel_to_hz(mel), sample_rate, fft_size).min(last_bin)
            })
            .collect();

        let filters = edges
            .windows(3)
            .map(|w| {
                let (left, center, right) = (w[0], w[1], w[2]);
                let weights = (left..=right)
                    .map(|k| {
                        if k == center {
                            1.0
                        } else if k < center {
                            (k - left) as f32 / (center - left) as f32
                        } else {
                            (right - k) as f32 / (right - center) as f32
                        }
                    })
                    .collect();
                MelFilter {
                    start_bin: left,
                    weights,
                }
            })
            .collect();

        Self {
            filters,
            num_bins,
            sample_rate,
        }
    }

    /// Log filter energies: `ln(sum(weight * magnitude) + eps)` per filter
    pub fn log_energies(&self, magnitudes: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                let energy: f32 = filter
                    .weights
                    .iter()
                    .enumerate()
                    .filter_map(|(offset, &w)| {
                        magnitudes.get(filter.start_bin + offset).map(|&m| w * m)
                    })
                    .sum();
                (energy + EPSILON).ln()
            })
            .collect()
    }

    pub fn num_filters(&self) -> usize {
        self.filters.len()
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// DCT-II of `input`, returning the first `count` coefficients
pub fn dct_ii(input: &[f32], count: usize) -> Vec<f32> {
    let n = input.len() as f32;
    (0..count.min(input.len()))
        .map(|k| {
            input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (PI * k as f32 * (i as f32 + 0.5) / n).cos())
                .sum()
        })
        .collect()
}

/// Per-frame MFCC computation with a cached filter bank
#[derive(Debug, Clone)]
pub struct MfccExtractor {
    params: MfccParams,
    bank: MelFilterBank,
}

impl MfccExtractor {
    pub fn new(params: MfccParams, num_bins: usize, sample_rate: u32) -> Self {
        Self {
            params,
            bank: MelFilterBank::new(params.num_mel_bands, num_bins, sample_rate),
        }
    }

    /// Coefficients for one linear magnitude spectrum.
    ///
    /// The filter bank is rebuilt when the spectrum length changes.
    pub fn compute(&mut self, magnitudes: &[f32]) -> Vec<f32> {
        if magnitudes.len() != self.bank.num_bins() {
            self.bank = MelFilterBank::new(
                self.params.num_mel_bands,
                magnitudes.len(),
                self.bank.sample_rate(),
            );
        }

        let log_energies = self.bank.log_energies(magnitudes);
        dct_ii(&log_energies, self.params.num_coefficients)
    }

    pub fn params(&self) -> MfccParams {
        self.params
    }
}
