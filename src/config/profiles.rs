// src/config/profiles.rs
//
// Preset detection profiles trading false positives against missed segments

use serde::{Deserialize, Serialize};

use super::settings::DetectionConfig;

/// Preset profiles for common use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigPreset {
    /// Balanced defaults
    #[default]
    Standard,
    /// Lower voice and classification thresholds; more candidates, more noise
    Sensitive,
    /// Only well-formed, high-SNR segments are reported
    Strict,
}

impl ConfigPreset {
    pub fn all() -> [Self; 3] {
        [Self::Standard, Self::Sensitive, Self::Strict]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfigPreset::Standard => "standard",
            ConfigPreset::Sensitive => "sensitive",
            ConfigPreset::Strict => "strict",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConfigPreset::Standard => "Balanced defaults",
            ConfigPreset::Sensitive => "Quiet recordings; reports weaker segments",
            ConfigPreset::Strict => "Noisy environments; reports only strong segments",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "standard" | "default" => Some(Self::Standard),
            "sensitive" => Some(Self::Sensitive),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    /// Apply the preset's thresholds on top of `base`
    pub fn apply(&self, base: DetectionConfig) -> DetectionConfig {
        match self {
            ConfigPreset::Standard => base,
            ConfigPreset::Sensitive => DetectionConfig {
                sensitivity: 0.5,
                classification_threshold: 0.4,
                voice_threshold_db: base.voice_threshold_db - 10.0,
                ..base
            },
            ConfigPreset::Strict => DetectionConfig {
                sensitivity: 0.9,
                classification_threshold: 0.8,
                noise_gate_threshold_db: base.noise_gate_threshold_db + 20.0,
                ..base
            },
        }
    }
}

impl From<ConfigPreset> for DetectionConfig {
    fn from(preset: ConfigPreset) -> Self {
        preset.apply(DetectionConfig::default())
    }
}
