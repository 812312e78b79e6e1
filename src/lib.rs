//! evpcheckr - Real-time EVP detection for streaming audio
//!
//! A tick-driven engine that turns blocks of time-domain audio into
//! spectral frames, decides per frame whether the content is voice-like,
//! and scores runs of voice-like frames as possible EVP events.
//!
//! ## Pipeline
//!
//! 1. **Transform**: windowed real FFT, magnitudes in dB clipped to `[min_db, max_db]`
//! 2. **Features**: centroid, spread, flux, rolloff, flatness, energy, ZCR, MFCC
//! 3. **Voice activity**: band energy, harmonic series, formants, feature ranges
//! 4. **Accumulation**: ten voice frames per classification cycle
//! 5. **Classification**: SNR, spectral anomaly and features produce a
//!    confidence and a Class A/B/C tier
//!
//! ## Module Structure
//!
//! - `core` - DSP, analysis stages, the engine, decoding and visualization
//! - `cli` - Command-line interface
//! - `config` - Detection configuration, partial updates and presets
//! - `detection` - Detection records and engine statistics
//! - `error` - Library error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use evpcheckr::{ConfigPreset, EvpDetector, SampleBufferSource};
//!
//! let source = SampleBufferSource::new(samples, 44100, 735);
//! let mut detector = EvpDetector::builder()
//!     .preset(ConfigPreset::Sensitive)
//!     .source(source)
//!     .on_detection(|d| println!("{} at {} ms", d.classification.name(), d.timestamp_ms))
//!     .build()?;
//!
//! detector.start(None)?;
//! for tick in 0..ticks {
//!     detector.tick(tick * 16);
//! }
//! detector.dispose();
//! ```
//!
//! ## Classification Tiers
//!
//! | Class   | Confidence | SNR      |
//! |---------|------------|----------|
//! | Class A | > 0.8      | > 20 dB  |
//! | Class B | > 0.6      | > 10 dB  |
//! | Class C | > 0.4      | > 5 dB   |

// Core analysis functionality
pub mod core;

// Command-line interface
pub mod cli;

// Configuration and presets
pub mod config;

// Detection result types
pub mod detection;

pub mod error;

// Re-export commonly used types at crate root for convenience
pub use config::{ConfigPreset, ConfigUpdate, DetectionConfig, FluxMode};
pub use detection::{DetectorStats, EvpClass, EvpDetection};
pub use error::{ConfigError, EvpError, Result};
pub use core::{
    AudioAnalyzer, AnalyzerBuilder, AudioSource, DetectorBuilder, DetectorState,
    EvpDetector, SampleBufferSource, ScanReport, SpectralFeatures, SpectralFrame,
    WindowType,
};
