//! Audio analysis algorithms
//!
//! Contains the per-frame and per-segment stages of the detection pipeline:
//! - Feature extraction (centroid, spread, flux, rolloff, flatness, energy, ZCR)
//! - MFCC (mel filter bank + DCT)
//! - Voice activity scoring
//! - EVP segment classification

mod evp;
mod features;
mod mfcc;
mod voice;

pub use evp::{
    anomaly_count, average_spectrum, confidence_score, dominant_frequency,
    signal_to_noise_db, EvpAssessment, EvpClassifier,
};
pub use features::{
    adjacent_bin_flux, inter_frame_flux, linear_magnitudes, spectral_centroid,
    spectral_energy, spectral_flatness, spectral_rolloff, spectral_spread,
    FeatureExtractor, SpectralFeatures, ROLLOFF_THRESHOLD,
};
pub use mfcc::{dct_ii, hz_to_mel, mel_to_hz, MelFilterBank, MfccExtractor, MfccParams};
pub use voice::{
    features_in_voice_range, has_formants, has_harmonic_series, VoiceActivityClassifier,
    VoiceScore,
};
