//! Detection records, classification tiers and engine statistics

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::analysis::SpectralFeatures;

/// Confidence tier of a classified segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvpClass {
    ClassA,
    ClassB,
    ClassC,
    Unknown,
}

impl EvpClass {
    /// Map confidence and SNR to a tier. All bounds are strict.
    pub fn from_scores(confidence: f32, snr_db: f32) -> Self {
        if confidence > 0.8 && snr_db > 20.0 {
            EvpClass::ClassA
        } else if confidence > 0.6 && snr_db > 10.0 {
            EvpClass::ClassB
        } else if confidence > 0.4 && snr_db > 5.0 {
            EvpClass::ClassC
        } else {
            EvpClass::Unknown
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EvpClass::ClassA => "Class A",
            EvpClass::ClassB => "Class B",
            EvpClass::ClassC => "Class C",
            EvpClass::Unknown => "Unknown",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            EvpClass::ClassA => "★★★",
            EvpClass::ClassB => "★★☆",
            EvpClass::ClassC => "★☆☆",
            EvpClass::Unknown => "☆☆☆",
        }
    }

    pub fn color_code(&self) -> &'static str {
        match self {
            EvpClass::ClassA => "\x1b[35m",  // magenta
            EvpClass::ClassB => "\x1b[33m",  // yellow
            EvpClass::ClassC => "\x1b[36m",  // cyan
            EvpClass::Unknown => "\x1b[90m", // gray
        }
    }
}

/// One classified accumulation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvpDetection {
    pub id: Uuid,
    /// Timestamp of the tick that completed the cycle
    pub timestamp_ms: i64,
    /// Audio covered by the accumulated frames
    pub duration_ms: f64,
    /// 0.0-1.0
    pub confidence: f32,
    pub classification: EvpClass,
    pub dominant_frequency_hz: f32,
    /// Loudest bin across the accumulated spectra, in dB
    pub amplitude: f32,
    /// Peak minus median of the averaged spectrum, in dB
    pub snr_db: f32,
    pub features: SpectralFeatures,
}

/// Snapshot returned by `EvpDetector::stats`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorStats {
    pub is_detecting: bool,
    /// Voice frames waiting in the accumulator (0..=10)
    pub buffer_size: usize,
    /// Fraction of voice decisions in the capped history
    pub voice_activity_rate: f32,
    pub frames_processed: u64,
    pub detections_emitted: u64,
    /// False when the last tick found no audio upstream
    pub source_available: bool,
}
