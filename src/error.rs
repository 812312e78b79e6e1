//! Error types for evpcheckr

use thiserror::Error;

/// Configuration rejected at construction or update time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid frequency range: min {min} Hz must be below max {max} Hz")]
    InvalidFrequencyRange { min: f32, max: f32 },

    #[error("Invalid FFT size {0}: must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),

    #[error("Invalid sensitivity {0}: must be within [0, 1]")]
    InvalidSensitivity(f32),

    #[error("Invalid classification threshold {0}: must be within [0, 1]")]
    InvalidClassificationThreshold(f32),

    #[error("Invalid dB range: min {min} dB must be below max {max} dB")]
    InvalidDbRange { min: f32, max: f32 },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Invalid MFCC layout: {coefficients} coefficients from {filters} mel filters")]
    InvalidMfccLayout { coefficients: usize, filters: usize },

    #[error("Invalid threshold {name}: {value}")]
    NonFiniteThreshold { name: &'static str, value: f32 },
}

/// Top-level error type for engine operations
#[derive(Debug, Error)]
pub enum EvpError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Detector has been disposed")]
    Disposed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EvpError>;
