// src/config/settings.rs
//
// Detection configuration, partial updates and validation

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::dsp::WindowType;
use crate::error::{ConfigError, Result};

/// How spectral flux is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluxMode {
    /// Differences between neighbouring bins of the current frame
    #[default]
    AdjacentBin,
    /// Differences against the same bin of the previous frame
    InterFrame,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Voice-likelihood score a frame must reach (0.0-1.0)
    pub sensitivity: f32,
    /// Lower edge of the voice band in Hz
    pub min_frequency_hz: f32,
    /// Upper edge of the voice band in Hz
    pub max_frequency_hz: f32,
    /// Band energy a voiced frame must exceed
    pub voice_threshold_db: f32,
    /// Frames whose loudest bin stays below this are treated as silence
    pub noise_gate_threshold_db: f32,
    /// Minimum confidence for a detection to be emitted (0.0-1.0)
    pub classification_threshold: f32,
    pub fft_size: usize,
    pub window_function: WindowType,
    pub sample_rate: u32,
    /// Spectrum clipping floor
    pub min_db: f32,
    /// Spectrum clipping ceiling
    pub max_db: f32,
    pub num_mel_filters: usize,
    pub num_mfcc: usize,
    pub flux_mode: FluxMode,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.7,
            min_frequency_hz: 85.0,
            max_frequency_hz: 3400.0,
            voice_threshold_db: -40.0,
            noise_gate_threshold_db: -90.0,
            classification_threshold: 0.6,
            fft_size: 4096,
            window_function: WindowType::Hann,
            sample_rate: 44100,
            min_db: -100.0,
            max_db: -10.0,
            num_mel_filters: 26,
            num_mfcc: 13,
            flux_mode: FluxMode::AdjacentBin,
        }
    }
}

impl DetectionConfig {
    pub const MIN_FFT_SIZE: usize = 32;
    pub const MAX_FFT_SIZE: usize = 32768;

    /// Check every invariant; the first violation is reported
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (name, value) in [
            ("voice_threshold_db", self.voice_threshold_db),
            ("noise_gate_threshold_db", self.noise_gate_threshold_db),
            ("min_frequency_hz", self.min_frequency_hz),
            ("max_frequency_hz", self.max_frequency_hz),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteThreshold { name, value });
            }
        }

        if self.min_frequency_hz < 0.0 || self.min_frequency_hz >= self.max_frequency_hz {
            return Err(ConfigError::InvalidFrequencyRange {
                min: self.min_frequency_hz,
                max: self.max_frequency_hz,
            });
        }

        if !self.fft_size.is_power_of_two()
            || !(Self::MIN_FFT_SIZE..=Self::MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(ConfigError::InvalidFftSize(self.fft_size));
        }

        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(ConfigError::InvalidSensitivity(self.sensitivity));
        }

        if !(0.0..=1.0).contains(&self.classification_threshold) {
            return Err(ConfigError::InvalidClassificationThreshold(
                self.classification_threshold,
            ));
        }

        if !(self.min_db < self.max_db) {
            return Err(ConfigError::InvalidDbRange {
                min: self.min_db,
                max: self.max_db,
            });
        }

        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }

        if self.num_mel_filters == 0 || self.num_mfcc == 0 || self.num_mfcc > self.num_mel_filters {
            return Err(ConfigError::InvalidMfccLayout {
                coefficients: self.num_mfcc,
                filters: self.num_mel_filters,
            });
        }

        Ok(())
    }

    /// Return a copy with `update` applied, validated as a whole
    pub fn merged(&self, update: &ConfigUpdate) -> std::result::Result<Self, ConfigError> {
        let mut next = self.clone();
        update.apply_to(&mut next);
        next.validate()?;
        Ok(next)
    }

    /// Duration of one analysis block in milliseconds
    pub fn frame_duration_ms(&self) -> f64 {
        self.fft_size as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Load a (possibly partial) configuration from a JSON file.
    ///
    /// Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Default location of the user configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("evpcheckr").join("config.json"))
    }
}

/// Partial configuration change; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub sensitivity: Option<f32>,
    pub min_frequency_hz: Option<f32>,
    pub max_frequency_hz: Option<f32>,
    pub voice_threshold_db: Option<f32>,
    pub noise_gate_threshold_db: Option<f32>,
    pub classification_threshold: Option<f32>,
    pub fft_size: Option<usize>,
    pub window_function: Option<WindowType>,
    pub sample_rate: Option<u32>,
    pub min_db: Option<f32>,
    pub max_db: Option<f32>,
    pub num_mel_filters: Option<usize>,
    pub num_mfcc: Option<usize>,
    pub flux_mode: Option<FluxMode>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sensitivity(mut self, value: f32) -> Self {
        self.sensitivity = Some(value);
        self
    }

    pub fn frequency_range(mut self, min_hz: f32, max_hz: f32) -> Self {
        self.min_frequency_hz = Some(min_hz);
        self.max_frequency_hz = Some(max_hz);
        self
    }

    pub fn voice_threshold_db(mut self, value: f32) -> Self {
        self.voice_threshold_db = Some(value);
        self
    }

    pub fn noise_gate_threshold_db(mut self, value: f32) -> Self {
        self.noise_gate_threshold_db = Some(value);
        self
    }

    pub fn classification_threshold(mut self, value: f32) -> Self {
        self.classification_threshold = Some(value);
        self
    }

    pub fn fft_size(mut self, value: usize) -> Self {
        self.fft_size = Some(value);
        self
    }

    pub fn window_function(mut self, value: WindowType) -> Self {
        self.window_function = Some(value);
        self
    }

    pub fn sample_rate(mut self, value: u32) -> Self {
        self.sample_rate = Some(value);
        self
    }

    pub fn db_range(mut self, min_db: f32, max_db: f32) -> Self {
        self.min_db = Some(min_db);
        self.max_db = Some(max_db);
        self
    }

    pub fn flux_mode(mut self, value: FluxMode) -> Self {
        self.flux_mode = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when the update forces transform buffers or filter banks to be rebuilt
    pub fn touches_transform(&self) -> bool {
        self.fft_size.is_some()
            || self.window_function.is_some()
            || self.sample_rate.is_some()
            || self.min_db.is_some()
            || self.max_db.is_some()
            || self.num_mel_filters.is_some()
            || self.num_mfcc.is_some()
    }

    fn apply_to(&self, config: &mut DetectionConfig) {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }

        apply!(
            sensitivity,
            min_frequency_hz,
            max_frequency_hz,
            voice_threshold_db,
            noise_gate_threshold_db,
            classification_threshold,
            fft_size,
            window_function,
            sample_rate,
            min_db,
            max_db,
            num_mel_filters,
            num_mfcc,
            flux_mode,
        );
    }
}
