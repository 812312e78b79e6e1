// src/core/analyzer.rs
//
// Offline scan of an audio file: decode, downmix, then drive a private
// engine tick by tick over the signal as if it were a live stream.

use anyhow::Result;
use chrono::{DateTime, Local};
use log::debug;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::decoder::{decode_audio, extract_mono, AudioData};
use super::detector::EvpDetector;
use super::source::SampleBufferSource;
use crate::config::{ConfigPreset, DetectionConfig};
use crate::detection::{DetectorStats, EvpDetection};

/// Default tick cadence in Hz used to derive the hop
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// File information extracted before full decoding
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub extension: String,
}

impl FileInfo {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase(),
        })
    }
}

/// Result of scanning one file
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub file: FileInfo,
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_secs: f64,
    pub codec: String,
    pub hop_size: usize,
    pub ticks: usize,
    pub detections: Vec<EvpDetection>,
    pub stats: DetectorStats,
    pub analyzed_at: DateTime<Local>,
    pub elapsed_ms: u64,
    /// Rolling spectrogram at the end of the scan, oldest row first
    #[serde(skip)]
    pub spectrogram: VecDeque<Vec<f32>>,
}

/// Builder for AudioAnalyzer configuration
pub struct AnalyzerBuilder {
    config: DetectionConfig,
    hop_size: Option<usize>,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectionConfig::default(),
            hop_size: None,
        }
    }

    pub fn config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn preset(mut self, preset: ConfigPreset) -> Self {
        self.config = preset.apply(self.config);
        self
    }

    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.config.sensitivity = sensitivity;
        self
    }

    /// Samples advanced per tick; defaults to sample_rate / 60
    pub fn hop_size(mut self, hop: usize) -> Self {
        self.hop_size = Some(hop);
        self
    }

    pub fn build<P: AsRef<Path>>(self, path: P) -> Result<AudioAnalyzer> {
        let path = path.as_ref();
        let file = FileInfo::from_path(path)?;
        let audio = decode_audio(path)?;
        Ok(AudioAnalyzer {
            file,
            audio,
            config: self.config,
            hop_size: self.hop_size,
        })
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoded file ready to be scanned
pub struct AudioAnalyzer {
    file: FileInfo,
    audio: AudioData,
    config: DetectionConfig,
    hop_size: Option<usize>,
}

impl AudioAnalyzer {
    /// Create analyzer with default configuration
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        AnalyzerBuilder::new().build(path)
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Run the whole file through a fresh engine
    pub fn analyze(&self) -> Result<ScanReport> {
        let started = Instant::now();
        let analyzed_at = Local::now();

        let sample_rate = self.audio.sample_rate;
        let hop = self
            .hop_size
            .unwrap_or((sample_rate / DEFAULT_TICK_RATE_HZ) as usize)
            .max(1);

        let mut config = self.config.clone();
        config.sample_rate = sample_rate;

        let scan = scan_samples(extract_mono(&self.audio), config, hop)?;

        debug!(
            "{}: {} ticks, {} detections",
            self.file.path.display(),
            scan.ticks,
            scan.detections.len()
        );

        Ok(ScanReport {
            file: self.file.clone(),
            sample_rate,
            channels: self.audio.channels,
            duration_secs: self.audio.duration_secs,
            codec: self.audio.codec_name.clone(),
            hop_size: hop,
            ticks: scan.ticks,
            detections: scan.detections,
            stats: scan.stats,
            analyzed_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
            spectrogram: scan.spectrogram,
        })
    }

    pub fn audio_data(&self) -> &AudioData {
        &self.audio
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }
}

/// Everything a stream scan produces
#[derive(Debug, Clone)]
pub struct StreamScan {
    pub detections: Vec<EvpDetection>,
    pub stats: DetectorStats,
    pub spectrogram: VecDeque<Vec<f32>>,
    pub ticks: usize,
}

/// Feed a mono signal through an engine at `hop` samples per tick.
///
/// Each tick is stamped with the stream position after its pull.
pub fn scan_samples(
    samples: Vec<f32>,
    config: DetectionConfig,
    hop: usize,
) -> crate::error::Result<StreamScan> {
    let sample_rate = config.sample_rate.max(1) as usize;
    let source = SampleBufferSource::new(samples, config.sample_rate, hop);
    let ticks = source.tick_count();
    let hop = source.hop();

    let mut detector = EvpDetector::builder().config(config).source(source).build()?;
    detector.start(None)?;

    let mut detections = Vec::new();
    for tick in 1..=ticks {
        let timestamp_ms = (tick * hop * 1000 / sample_rate) as i64;
        if let Some(detection) = detector.tick(timestamp_ms) {
            detections.push(detection);
        }
    }

    detector.stop();
    let stats = detector.stats();
    let spectrogram = detector.spectrogram().cloned().unwrap_or_default();
    detector.dispose();

    Ok(StreamScan {
        detections,
        stats,
        spectrogram,
        ticks,
    })
}
