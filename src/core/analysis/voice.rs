// src/core/analysis/voice.rs
//
// Per-frame voice activity decision. Four independent predicates add fixed
// weights to a 0-1 score which is compared against the configured sensitivity.

use log::trace;

use super::features::SpectralFeatures;
use crate::config::DetectionConfig;
use crate::core::dsp::stats::{band_energy_db, find_peaks, frequency_bin, SpectralPeak};

/// Predicate weights in hundredths, summed as integers so that threshold
/// comparisons are exact
const BAND_ENERGY_POINTS: u32 = 30;
const HARMONIC_POINTS: u32 = 30;
const FORMANT_POINTS: u32 = 20;
const FEATURE_RANGE_POINTS: u32 = 20;

const PITCH_PEAK_THRESHOLD_DB: f32 = -40.0;
const PITCH_PEAK_DISTANCE: usize = 5;
const MIN_F0_HZ: f32 = 85.0;
const MAX_F0_HZ: f32 = 500.0;
/// Harmonics 2..=MAX_HARMONIC are probed above each candidate fundamental
const MAX_HARMONIC: usize = 5;
const MIN_HARMONICS: usize = 3;
const HARMONIC_FLOOR_OFFSET_DB: f32 = 20.0;

const FORMANT_PEAK_THRESHOLD_DB: f32 = -30.0;
const FORMANT_PEAK_DISTANCE: usize = 20;
const F1_RANGE: (f32, f32) = (200.0, 1000.0);
const F2_RANGE: (f32, f32) = (800.0, 2800.0);

/// Breakdown of one voice decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceScore {
    /// 0.0-1.0
    pub score: f32,
    pub band_energy_db: f32,
    pub band_energy: bool,
    pub harmonic: bool,
    pub formants: bool,
    pub feature_range: bool,
}

impl VoiceScore {
    pub fn is_voice(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// Stateless scorer; reads thresholds from the config passed to each call
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceActivityClassifier;

impl VoiceActivityClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        spectrum_db: &[f32],
        features: &SpectralFeatures,
        config: &DetectionConfig,
    ) -> VoiceScore {
        let sample_rate = config.sample_rate;

        let energy_db = band_energy_db(
            spectrum_db,
            sample_rate,
            config.min_frequency_hz,
            config.max_frequency_hz,
        );
        let band_energy = energy_db > config.voice_threshold_db;
        let harmonic = has_harmonic_series(spectrum_db, sample_rate, config.min_db);
        let formants = has_formants(spectrum_db, sample_rate);
        let feature_range = features_in_voice_range(features);

        let points = [
            (band_energy, BAND_ENERGY_POINTS),
            (harmonic, HARMONIC_POINTS),
            (formants, FORMANT_POINTS),
            (feature_range, FEATURE_RANGE_POINTS),
        ]
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, p)| p)
        .sum::<u32>();

        let score = VoiceScore {
            score: points as f32 / 100.0,
            band_energy_db: energy_db,
            band_energy,
            harmonic,
            formants,
            feature_range,
        };
        trace!("Voice score {:?}", score);
        score
    }

    pub fn is_voice(
        &self,
        spectrum_db: &[f32],
        features: &SpectralFeatures,
        config: &DetectionConfig,
    ) -> bool {
        self.score(spectrum_db, features, config).is_voice(config.sensitivity)
    }
}

/// True when some peak between 85 and 500 Hz has at least three of its
/// harmonics 2..=5 standing `HARMONIC_FLOOR_OFFSET_DB` above the floor
pub fn has_harmonic_series(spectrum_db: &[f32], sample_rate: u32, min_db: f32) -> bool {
    let fft_size = spectrum_db.len() * 2;
    let floor = min_db + HARMONIC_FLOOR_OFFSET_DB;

    find_peaks(spectrum_db, sample_rate, PITCH_PEAK_THRESHOLD_DB, PITCH_PEAK_DISTANCE)
        .iter()
        .filter(|p| p.frequency >= MIN_F0_HZ && p.frequency <= MAX_F0_HZ)
        .any(|f0| {
            let found = (2..=MAX_HARMONIC)
                .filter_map(|n| {
                    let bin = frequency_bin(f0.frequency * n as f32, sample_rate, fft_size);
                    spectrum_db.get(bin)
                })
                .filter(|&&db| db > floor)
                .count();
            found >= MIN_HARMONICS
        })
}

/// True when distinct first- and second-formant peaks are present
pub fn has_formants(spectrum_db: &[f32], sample_rate: u32) -> bool {
    let peaks = find_peaks(spectrum_db, sample_rate, FORMANT_PEAK_THRESHOLD_DB, FORMANT_PEAK_DISTANCE);
    let in_range = |p: &&SpectralPeak, (lo, hi): (f32, f32)| p.frequency >= lo && p.frequency <= hi;

    match peaks.iter().find(|p| in_range(p, F1_RANGE)) {
        Some(f1) => peaks
            .iter()
            .any(|p| p.bin != f1.bin && in_range(&p, F2_RANGE)),
        None => false,
    }
}

/// Centroid, zero-crossing rate and flatness all in their speech-like ranges
pub fn features_in_voice_range(features: &SpectralFeatures) -> bool {
    features.centroid > 200.0
        && features.centroid < 2000.0
        && features.zcr > 0.01
        && features.zcr < 0.1
        && features.flatness < 0.5
}
