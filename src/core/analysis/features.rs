// src/core/analysis/features.rs
//
// Per-frame spectral and temporal descriptors. Every formula works on the
// linear magnitudes m_i = 10^(dB_i / 20) of a dB half-spectrum.

use serde::{Deserialize, Serialize};

use super::mfcc::{MfccExtractor, MfccParams};
use crate::config::{DetectionConfig, FluxMode};
use crate::core::dsp::stats::{bin_frequency, db_to_amplitude, zero_crossing_rate, EPSILON};
use crate::core::dsp::SpectralFrame;

/// Descriptors of one spectral frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// Magnitude-weighted mean frequency (Hz)
    pub centroid: f32,
    /// Magnitude-weighted standard deviation around the centroid (Hz)
    pub spread: f32,
    pub flux: f32,
    /// Frequency below which 85% of the magnitude lies (Hz)
    pub rolloff: f32,
    /// Geometric over arithmetic mean; 1 for flat, near 0 for tonal
    pub flatness: f32,
    pub energy: f32,
    /// Fraction of adjacent sample pairs that change sign
    pub zcr: f32,
    pub mfcc: Vec<f32>,
}

/// Rolloff fraction used by the extractor
pub const ROLLOFF_THRESHOLD: f32 = 0.85;

pub fn linear_magnitudes(spectrum_db: &[f32]) -> Vec<f32> {
    spectrum_db.iter().map(|&db| db_to_amplitude(db)).collect()
}

/// Compute spectral centroid (brightness measure)
pub fn spectral_centroid(magnitudes: &[f32], sample_rate: u32) -> f32 {
    let fft_size = magnitudes.len() * 2;
    let total: f32 = magnitudes.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let weighted: f32 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| bin_frequency(i, sample_rate, fft_size) * m)
        .sum();

    weighted / total
}

/// Compute spectral spread (bandwidth)
pub fn spectral_spread(magnitudes: &[f32], sample_rate: u32, centroid: f32) -> f32 {
    let fft_size = magnitudes.len() * 2;
    let total: f32 = magnitudes.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let variance: f32 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| {
            let diff = bin_frequency(i, sample_rate, fft_size) - centroid;
            diff * diff * m
        })
        .sum();

    (variance / (total + EPSILON)).sqrt()
}

/// Single-frame flux proxy: `sqrt(sum((dB_i - dB_{i-1})^2))`
pub fn adjacent_bin_flux(spectrum_db: &[f32]) -> f32 {
    spectrum_db
        .windows(2)
        .map(|w| {
            let diff = w[1] - w[0];
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}

/// Frame-to-frame flux over dB spectra of equal length; 0 on length mismatch
pub fn inter_frame_flux(previous_db: &[f32], current_db: &[f32]) -> f32 {
    if previous_db.len() != current_db.len() {
        return 0.0;
    }

    previous_db
        .iter()
        .zip(current_db)
        .map(|(&prev, &curr)| {
            let diff = curr - prev;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}

/// Frequency of the first bin at which cumulative magnitude reaches
/// `threshold` of the total; Nyquist when never reached
pub fn spectral_rolloff(magnitudes: &[f32], sample_rate: u32, threshold: f32) -> f32 {
    let fft_size = magnitudes.len() * 2;
    let target = magnitudes.iter().sum::<f32>() * threshold;

    let mut cumulative = 0.0f32;
    for (i, &m) in magnitudes.iter().enumerate() {
        cumulative += m;
        if cumulative >= target {
            return bin_frequency(i, sample_rate, fft_size);
        }
    }

    sample_rate as f32 / 2.0
}

/// Compute spectral flatness (Wiener entropy) over strictly positive bins
pub fn spectral_flatness(magnitudes: &[f32]) -> f32 {
    let (count, log_sum, sum) = magnitudes
        .iter()
        .filter(|&&m| m > 0.0)
        .fold((0usize, 0.0f64, 0.0f64), |(n, ls, s), &m| {
            (n + 1, ls + (m as f64).ln(), s + m as f64)
        });

    if count == 0 {
        return 0.0;
    }

    let geometric_mean = (log_sum / count as f64).exp();
    let arithmetic_mean = sum / count as f64;

    if arithmetic_mean < EPSILON as f64 {
        return 0.0;
    }

    (geometric_mean / arithmetic_mean) as f32
}

pub fn spectral_energy(magnitudes: &[f32]) -> f32 {
    magnitudes.iter().map(|m| m * m).sum()
}

/// Stateful extractor; holds the MFCC filter bank and, in inter-frame flux
/// mode, the previous spectrum
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    sample_rate: u32,
    flux_mode: FluxMode,
    mfcc: MfccExtractor,
    previous_db: Option<Vec<f32>>,
}

impl FeatureExtractor {
    pub fn new(config: &DetectionConfig) -> Self {
        let params = MfccParams {
            num_coefficients: config.num_mfcc,
            num_mel_bands: config.num_mel_filters,
        };
        Self {
            sample_rate: config.sample_rate,
            flux_mode: config.flux_mode,
            mfcc: MfccExtractor::new(params, config.fft_size / 2, config.sample_rate),
            previous_db: None,
        }
    }

    pub fn extract(&mut self, frame: &SpectralFrame) -> SpectralFeatures {
        self.extract_parts(&frame.magnitudes_db, &frame.time_domain)
    }

    pub fn extract_parts(&mut self, spectrum_db: &[f32], time_domain: &[f32]) -> SpectralFeatures {
        let magnitudes = linear_magnitudes(spectrum_db);
        let centroid = spectral_centroid(&magnitudes, self.sample_rate);

        let flux = match self.flux_mode {
            FluxMode::AdjacentBin => adjacent_bin_flux(spectrum_db),
            FluxMode::InterFrame => {
                let flux = self
                    .previous_db
                    .as_deref()
                    .map_or(0.0, |prev| inter_frame_flux(prev, spectrum_db));
                self.previous_db = Some(spectrum_db.to_vec());
                flux
            }
        };

        SpectralFeatures {
            centroid,
            spread: spectral_spread(&magnitudes, self.sample_rate, centroid),
            flux,
            rolloff: spectral_rolloff(&magnitudes, self.sample_rate, ROLLOFF_THRESHOLD),
            flatness: spectral_flatness(&magnitudes),
            energy: spectral_energy(&magnitudes),
            zcr: zero_crossing_rate(time_domain),
            mfcc: self.mfcc.compute(&magnitudes),
        }
    }

    /// Forget the previous frame
    pub fn reset(&mut self) {
        self.previous_db = None;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
