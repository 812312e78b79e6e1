//! Core analysis and detection modules

pub mod accumulator;
pub mod analysis;
pub mod analyzer;
pub mod decoder;
pub mod detector;
pub mod dsp;
pub mod source;
pub mod visualization;

pub use accumulator::{AccumulatorState, DetectionAccumulator, VoiceHistory};
pub use analysis::{EvpClassifier, FeatureExtractor, SpectralFeatures, VoiceActivityClassifier};
pub use analyzer::{scan_samples, AnalyzerBuilder, AudioAnalyzer, FileInfo, ScanReport, StreamScan};
pub use decoder::{decode_audio, extract_mono, AudioData};
pub use detector::{DetectionHandler, DetectorBuilder, DetectorState, EvpDetector};
pub use dsp::{SpectralFrame, SpectralTransformStage, WindowLibrary, WindowType};
pub use source::{AudioSource, SampleBufferSource};
