// src/core/analysis/evp.rs
//
// Segment-level scoring of an accumulated run of voice-like frames.
// The frames are averaged, SNR and a spectral anomaly flag are derived from
// the average, and together with the frame features they form a confidence
// value that maps onto a classification tier.

use log::debug;
use uuid::Uuid;

use super::features::SpectralFeatures;
use crate::config::DetectionConfig;
use crate::core::dsp::stats::{band_energy_db, find_peaks, percentile};
use crate::detection::{EvpClass, EvpDetection};

/// A bin standing this far above the mean of its neighbours counts as a spike
const SPIKE_THRESHOLD_DB: f32 = 20.0;
/// Spike count (plus the band-shape bonus) needed to flag an anomaly
const ANOMALY_MIN_COUNT: usize = 5;
/// Added to the spike count when the mid band dominates both neighbours
const BAND_SHAPE_BONUS: usize = 5;
const BAND_DOMINANCE_DB: f32 = 10.0;
const LOW_BAND: (f32, f32) = (0.0, 500.0);
const MID_BAND: (f32, f32) = (500.0, 2000.0);
const HIGH_BAND: (f32, f32) = (2000.0, 8000.0);

const DOMINANT_PEAK_THRESHOLD_DB: f32 = -30.0;
const DOMINANT_PEAK_DISTANCE: usize = 10;

/// Outcome of scoring one accumulated segment, emitted or not
#[derive(Debug, Clone, PartialEq)]
pub struct EvpAssessment {
    pub average_spectrum: Vec<f32>,
    pub snr_db: f32,
    pub anomaly_count: usize,
    pub anomaly: bool,
    pub confidence: f32,
    pub classification: EvpClass,
    pub dominant_frequency_hz: f32,
    /// Loudest bin across all frames, in dB
    pub amplitude: f32,
}

/// Per-bin arithmetic mean of the frames; the first frame fixes the length
pub fn average_spectrum(frames: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };

    let mut avg = vec![0.0f32; first.len()];
    for frame in frames {
        for (acc, &db) in avg.iter_mut().zip(frame) {
            *acc += db;
        }
    }

    let count = frames.len() as f32;
    for value in &mut avg {
        *value /= count;
    }
    avg
}

/// Peak bin minus median bin, in dB
pub fn signal_to_noise_db(spectrum_db: &[f32]) -> f32 {
    if spectrum_db.is_empty() {
        return 0.0;
    }
    let max = spectrum_db.iter().copied().fold(f32::MIN, f32::max);
    max - percentile(spectrum_db, 0.5)
}

/// Spike count plus the band-shape bonus; above `ANOMALY_MIN_COUNT` flags an anomaly
pub fn anomaly_count(spectrum_db: &[f32], sample_rate: u32) -> usize {
    let spikes = spectrum_db
        .windows(3)
        .filter(|w| w[1] - (w[0] + w[2]) / 2.0 > SPIKE_THRESHOLD_DB)
        .count();

    let band = |(lo, hi): (f32, f32)| band_energy_db(spectrum_db, sample_rate, lo, hi);
    let low = band(LOW_BAND);
    let mid = band(MID_BAND);
    let high = band(HIGH_BAND);

    if mid > low + BAND_DOMINANCE_DB && mid > high + BAND_DOMINANCE_DB {
        spikes + BAND_SHAPE_BONUS
    } else {
        spikes
    }
}

/// Confidence in hundredths, capped at 1.0
pub fn confidence_score(snr_db: f32, features: &SpectralFeatures, anomaly: bool) -> f32 {
    let mut points = 0u32;

    if snr_db > 10.0 {
        points += 30;
    } else if snr_db > 5.0 {
        points += 15;
    }
    if features.centroid > 300.0 && features.centroid < 1500.0 {
        points += 20;
    }
    if features.zcr > 0.02 && features.zcr < 0.08 {
        points += 15;
    }
    if features.flatness < 0.3 {
        points += 15;
    }
    if anomaly {
        points += 20;
    }

    points.min(100) as f32 / 100.0
}

/// Frequency of the strongest peak, or 0 when the spectrum has none
pub fn dominant_frequency(spectrum_db: &[f32], sample_rate: u32) -> f32 {
    find_peaks(spectrum_db, sample_rate, DOMINANT_PEAK_THRESHOLD_DB, DOMINANT_PEAK_DISTANCE)
        .into_iter()
        .fold(None, |best: Option<(f32, f32)>, p| match best {
            Some((_, db)) if db >= p.magnitude_db => best,
            _ => Some((p.frequency, p.magnitude_db)),
        })
        .map_or(0.0, |(freq, _)| freq)
}

/// Scores completed accumulation cycles
#[derive(Debug, Clone)]
pub struct EvpClassifier {
    sample_rate: u32,
    fft_size: usize,
    classification_threshold: f32,
}

impl EvpClassifier {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            fft_size: config.fft_size,
            classification_threshold: config.classification_threshold,
        }
    }

    /// Score a segment. `None` only when `frames` is empty.
    pub fn assess(&self, frames: &[Vec<f32>], features: &SpectralFeatures) -> Option<EvpAssessment> {
        if frames.is_empty() {
            return None;
        }

        let average = average_spectrum(frames);
        let snr_db = signal_to_noise_db(&average);
        let anomaly_count = anomaly_count(&average, self.sample_rate);
        let anomaly = anomaly_count > ANOMALY_MIN_COUNT;
        let confidence = confidence_score(snr_db, features, anomaly);

        let amplitude = frames
            .iter()
            .flat_map(|frame| frame.iter().copied())
            .fold(f32::MIN, f32::max);

        Some(EvpAssessment {
            dominant_frequency_hz: dominant_frequency(&average, self.sample_rate),
            average_spectrum: average,
            snr_db,
            anomaly_count,
            anomaly,
            confidence,
            classification: EvpClass::from_scores(confidence, snr_db),
            amplitude,
        })
    }

    /// Score a segment and build a detection if it clears the classification threshold
    pub fn classify(
        &self,
        frames: &[Vec<f32>],
        features: &SpectralFeatures,
        timestamp_ms: i64,
    ) -> Option<EvpDetection> {
        let assessment = self.assess(frames, features)?;

        if assessment.confidence < self.classification_threshold {
            debug!(
                "Segment rejected: confidence {:.2} < {:.2} (snr {:.1} dB, anomaly {})",
                assessment.confidence,
                self.classification_threshold,
                assessment.snr_db,
                assessment.anomaly
            );
            return None;
        }

        Some(EvpDetection {
            id: Uuid::new_v4(),
            timestamp_ms,
            duration_ms: self.segment_duration_ms(frames.len()),
            confidence: assessment.confidence,
            classification: assessment.classification,
            dominant_frequency_hz: assessment.dominant_frequency_hz,
            amplitude: assessment.amplitude,
            snr_db: assessment.snr_db,
            features: features.clone(),
        })
    }

    /// Audio time spanned by `frames` analysis blocks
    pub fn segment_duration_ms(&self, frames: usize) -> f64 {
        frames as f64 * self.fft_size as f64 * 1000.0 / self.sample_rate as f64
    }

    pub fn classification_threshold(&self) -> f32 {
        self.classification_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dsp::stats::frequency_bin;

    const SR: u32 = 44100;
    const BINS: usize = 2048;

    fn features(centroid: f32, zcr: f32, flatness: f32) -> SpectralFeatures {
        SpectralFeatures {
            centroid,
            zcr,
            flatness,
            ..Default::default()
        }
    }

    fn classifier() -> EvpClassifier {
        EvpClassifier::new(&DetectionConfig::default())
    }

    #[test]
    fn test_average_spectrum() {
        let frames = vec![vec![-10.0, -20.0], vec![-30.0, -40.0]];
        assert_eq!(average_spectrum(&frames), vec![-20.0, -30.0]);
        assert!(average_spectrum(&[]).is_empty());
    }

    #[test]
    fn test_snr_peak_minus_median() {
        let mut spectrum = vec![-80.0f32; 100];
        spectrum[10] = -30.0;
        assert_eq!(signal_to_noise_db(&spectrum), 50.0);
    }

    #[test]
    fn test_confidence_weights() {
        let voiced = features(1000.0, 0.05, 0.2);
        assert_eq!(confidence_score(25.0, &voiced, false), 0.8);
        assert_eq!(confidence_score(25.0, &voiced, true), 1.0);
        assert_eq!(confidence_score(7.0, &voiced, false), 0.65);
        assert_eq!(confidence_score(5.0, &voiced, false), 0.5);
        assert_eq!(confidence_score(0.0, &features(0.0, 0.0, 1.0), false), 0.0);
    }

    #[test]
    fn test_spikes_flag_anomaly() {
        let mut spectrum = vec![-90.0f32; BINS];
        for i in 0..6 {
            spectrum[600 + i * 40] = -40.0;
        }
        assert_eq!(anomaly_count(&spectrum, SR), 6);
    }

    #[test]
    fn test_mid_band_dominance_adds_bonus() {
        let mut spectrum = vec![-100.0f32; BINS];
        let start = frequency_bin(600.0, SR, BINS * 2);
        let end = frequency_bin(1800.0, SR, BINS * 2);
        for db in &mut spectrum[start..end] {
            *db = -40.0;
        }
        // The two plateau edges also register as spikes
        assert_eq!(anomaly_count(&spectrum, SR), BAND_SHAPE_BONUS + 2);
    }

    #[test]
    fn test_dominant_frequency_picks_strongest() {
        let mut spectrum = vec![-90.0f32; BINS];
        spectrum[50] = -25.0;
        spectrum[200] = -12.0;
        spectrum[400] = -20.0;
        let expected = 200.0 * SR as f32 / (BINS * 2) as f32;
        assert!((dominant_frequency(&spectrum, SR) - expected).abs() < 1e-3);
        assert_eq!(dominant_frequency(&vec![-90.0; BINS], SR), 0.0);
    }

    #[test]
    fn test_rejected_below_threshold() {
        let frames = vec![vec![-90.0f32; BINS]; 10];
        let weak = features(5000.0, 0.3, 0.9);
        assert!(classifier().classify(&frames, &weak, 0).is_none());

        let assessment = classifier().assess(&frames, &weak).unwrap();
        assert_eq!(assessment.confidence, 0.0);
        assert_eq!(assessment.classification, EvpClass::Unknown);
    }

    #[test]
    fn test_detection_fields() {
        let mut frame = vec![-80.0f32; BINS];
        frame[93] = -20.0;
        let mut loud = frame.clone();
        loud[93] = -15.0;
        let mut frames = vec![frame; 9];
        frames.push(loud);

        let detection = classifier()
            .classify(&frames, &features(1000.0, 0.05, 0.2), 1234)
            .unwrap();

        assert_eq!(detection.timestamp_ms, 1234);
        assert_eq!(detection.amplitude, -15.0);
        assert!((detection.duration_ms - 10.0 * 4096.0 * 1000.0 / 44100.0).abs() < 1e-6);
        assert!((detection.dominant_frequency_hz - 93.0 * 44100.0 / 4096.0).abs() < 1e-2);
        assert!(detection.snr_db > 20.0);
        assert_eq!(detection.confidence, 0.8);
        assert_eq!(detection.classification, EvpClass::ClassB);
    }
}
