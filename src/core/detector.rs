// src/core/detector.rs
//
// Tick-driven detection engine. One tick runs the whole pipeline to
// completion: transform -> features -> voice decision -> accumulate ->
// (maybe) classify -> (maybe) notify observers.

use std::collections::VecDeque;

use log::{debug, info, trace, warn};

use super::accumulator::{AccumulatorState, DetectionAccumulator};
use super::analysis::{EvpClassifier, FeatureExtractor, VoiceActivityClassifier};
use super::dsp::stats::{bin_frequency, frequency_bin};
use super::dsp::{SpectralFrame, SpectralTransformStage, WindowType};
use super::source::AudioSource;
use crate::config::{ConfigPreset, ConfigUpdate, DetectionConfig};
use crate::detection::{DetectorStats, EvpDetection};
use crate::error::{EvpError, Result};

/// Observer invoked synchronously for every emitted detection
pub type DetectionHandler = Box<dyn FnMut(&EvpDetection) + Send>;

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Detecting,
    Disposed,
}

/// Builder for EvpDetector configuration
pub struct DetectorBuilder {
    config: DetectionConfig,
    source: Option<Box<dyn AudioSource + Send>>,
    handlers: Vec<DetectionHandler>,
}

impl DetectorBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectionConfig::default(),
            source: None,
            handlers: Vec::new(),
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

    pub fn classification_threshold(mut self, threshold: f32) -> Self {
        self.config.classification_threshold = threshold;
        self
    }

    pub fn fft_size(mut self, fft_size: usize) -> Self {
        self.config.fft_size = fft_size;
        self
    }

    pub fn window(mut self, window: WindowType) -> Self {
        self.config.window_function = window;
        self
    }

    /// Attach a source; its sample rate overrides the configured one
    pub fn source<S: AudioSource + Send + 'static>(mut self, source: S) -> Self {
        self.config.sample_rate = source.sample_rate();
        self.source = Some(Box::new(source));
        self
    }

    pub fn on_detection<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&EvpDetection) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn build(self) -> Result<EvpDetector> {
        let mut detector = EvpDetector::new(self.config)?;
        detector.source = self.source;
        detector.handlers = self.handlers;
        Ok(detector)
    }
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Real-time EVP detection engine
pub struct EvpDetector {
    config: DetectionConfig,
    state: DetectorState,
    /// `None` once disposed
    stage: Option<SpectralTransformStage>,
    extractor: FeatureExtractor,
    voice: VoiceActivityClassifier,
    classifier: EvpClassifier,
    accumulator: DetectionAccumulator,
    source: Option<Box<dyn AudioSource + Send>>,
    handlers: Vec<DetectionHandler>,
    block: Vec<f32>,
    frames_processed: u64,
    detections_emitted: u64,
    source_available: bool,
}

impl EvpDetector {
    /// Create an idle engine; fails fast on an invalid configuration
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;

        let stage = SpectralTransformStage::new(
            config.fft_size,
            config.window_function,
            config.sample_rate,
            config.min_db,
            config.max_db,
        );

        Ok(Self {
            extractor: FeatureExtractor::new(&config),
            voice: VoiceActivityClassifier::new(),
            classifier: EvpClassifier::new(&config),
            accumulator: DetectionAccumulator::default(),
            stage: Some(stage),
            source: None,
            handlers: Vec::new(),
            block: vec![0.0; config.fft_size],
            frames_processed: 0,
            detections_emitted: 0,
            source_available: false,
            state: DetectorState::Idle,
            config,
        })
    }

    pub fn builder() -> DetectorBuilder {
        DetectorBuilder::new()
    }

    /// Replace the audio source. A differing sample rate is adopted into the config.
    pub fn attach_source<S: AudioSource + Send + 'static>(&mut self, source: S) -> Result<()> {
        if self.state == DetectorState::Disposed {
            return Err(EvpError::Disposed);
        }
        if source.sample_rate() != self.config.sample_rate {
            self.update_config(ConfigUpdate::new().sample_rate(source.sample_rate()))?;
        }
        self.source = Some(Box::new(source));
        Ok(())
    }

    /// Register an observer. Observers run in registration order on the ticking thread.
    pub fn on_detection<F>(&mut self, handler: F)
    where
        F: FnMut(&EvpDetection) + Send + 'static,
    {
        if self.state != DetectorState::Disposed {
            self.handlers.push(Box::new(handler));
        }
    }

    /// Begin detecting, resetting every buffer. No-op while already detecting.
    pub fn start(&mut self, sensitivity: Option<f32>) -> Result<()> {
        match self.state {
            DetectorState::Disposed => return Err(EvpError::Disposed),
            DetectorState::Detecting => return Ok(()),
            DetectorState::Idle => {}
        }

        if let Some(sensitivity) = sensitivity {
            self.config = self.config.merged(&ConfigUpdate::new().sensitivity(sensitivity))?;
        }

        self.accumulator.reset();
        self.extractor.reset();
        if let Some(stage) = self.stage.as_mut() {
            stage.clear_spectrogram();
        }

        self.state = DetectorState::Detecting;
        info!(
            "EVP detection started (sensitivity {:.2}, fft {}, {} Hz)",
            self.config.sensitivity, self.config.fft_size, self.config.sample_rate
        );
        Ok(())
    }

    /// Halt ticking. Buffers and emitted detections are left alone.
    pub fn stop(&mut self) {
        if self.state == DetectorState::Detecting {
            self.state = DetectorState::Idle;
            info!("EVP detection stopped after {} frames", self.frames_processed);
        }
    }

    /// Apply a partial update. The merged config is validated first; on
    /// error nothing changes.
    pub fn update_config(&mut self, update: ConfigUpdate) -> Result<()> {
        if self.state == DetectorState::Disposed {
            return Err(EvpError::Disposed);
        }
        if update.is_empty() {
            return Ok(());
        }

        let next = self.config.merged(&update)?;

        if update.touches_transform() {
            if let Some(stage) = self.stage.as_mut() {
                stage.set_fft_size(next.fft_size);
                stage.set_window(next.window_function);
                stage.set_sample_rate(next.sample_rate);
                stage.set_db_range(next.min_db, next.max_db);
            }

            let layout_changed = next.fft_size != self.config.fft_size
                || next.sample_rate != self.config.sample_rate
                || next.num_mel_filters != self.config.num_mel_filters
                || next.num_mfcc != self.config.num_mfcc;
            if layout_changed {
                debug!(
                    "Regenerating analysis buffers for fft {} at {} Hz",
                    next.fft_size, next.sample_rate
                );
                self.block = vec![0.0; next.fft_size];
                self.accumulator.clear_frames();
            }
        }

        if next.flux_mode != self.config.flux_mode || update.touches_transform() {
            self.extractor = FeatureExtractor::new(&next);
        }
        self.classifier = EvpClassifier::new(&next);
        self.config = next;
        Ok(())
    }

    /// Release the transform, stop ticking and drop every observer. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == DetectorState::Disposed {
            return;
        }
        self.state = DetectorState::Disposed;
        self.stage = None;
        self.source = None;
        self.handlers.clear();
        self.accumulator.reset();
        self.block = Vec::new();
        info!("EVP detector disposed");
    }

    /// Pull the latest block from the source and run one pipeline pass.
    ///
    /// No-op unless detecting. A missing or exhausted source is processed as
    /// silence and reported through `stats().source_available`.
    pub fn tick(&mut self, timestamp_ms: i64) -> Option<EvpDetection> {
        if self.state != DetectorState::Detecting {
            return None;
        }
        let stage = self.stage.as_mut()?;

        let available = match self.source.as_mut() {
            Some(source) => source.pull(&mut self.block),
            None => false,
        };
        if !available && self.source_available {
            warn!("Audio source unavailable, processing silence");
        }
        self.source_available = available;

        let frame = if available {
            stage.transform(&self.block)
        } else {
            stage.silent_frame()
        };

        self.run_pipeline(&frame, timestamp_ms)
    }

    /// Run one pipeline pass on an externally produced frame.
    ///
    /// Frames whose bin count does not match the configured FFT size are dropped.
    pub fn process_frame(&mut self, frame: &SpectralFrame, timestamp_ms: i64) -> Option<EvpDetection> {
        if self.state != DetectorState::Detecting {
            return None;
        }
        if frame.magnitudes_db.len() != self.config.fft_size / 2 {
            warn!(
                "Dropping frame with {} bins, expected {}",
                frame.magnitudes_db.len(),
                self.config.fft_size / 2
            );
            return None;
        }
        self.run_pipeline(frame, timestamp_ms)
    }

    fn run_pipeline(&mut self, frame: &SpectralFrame, timestamp_ms: i64) -> Option<EvpDetection> {
        if let Some(stage) = self.stage.as_mut() {
            stage.record(&frame.magnitudes_db);
        }
        self.frames_processed += 1;

        let features = self.extractor.extract(frame);
        let gated = frame.max_db() < self.config.noise_gate_threshold_db;
        let is_voice = !gated && self.voice.is_voice(&frame.magnitudes_db, &features, &self.config);
        trace!("t={}ms gated={} voice={}", timestamp_ms, gated, is_voice);

        if self.accumulator.push(is_voice, &frame.magnitudes_db) != AccumulatorState::Ready {
            return None;
        }

        let frames = self.accumulator.take_frames();
        let detection = self.classifier.classify(&frames, &features, timestamp_ms)?;
        self.emit(&detection);
        Some(detection)
    }

    fn emit(&mut self, detection: &EvpDetection) {
        self.detections_emitted += 1;
        info!(
            "{} detection at {} ms: confidence {:.2}, {:.0} Hz, snr {:.1} dB",
            detection.classification.name(),
            detection.timestamp_ms,
            detection.confidence,
            detection.dominant_frequency_hz,
            detection.snr_db
        );
        for handler in self.handlers.iter_mut() {
            handler(detection);
        }
    }

    pub fn stats(&self) -> DetectorStats {
        DetectorStats {
            is_detecting: self.state == DetectorState::Detecting,
            buffer_size: self.accumulator.len(),
            voice_activity_rate: self.accumulator.voice_activity_rate(),
            frames_processed: self.frames_processed,
            detections_emitted: self.detections_emitted,
            source_available: self.source_available,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn is_detecting(&self) -> bool {
        self.state == DetectorState::Detecting
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Rolling spectrogram, oldest row first; `None` once disposed
    pub fn spectrogram(&self) -> Option<&VecDeque<Vec<f32>>> {
        self.stage.as_ref().map(|stage| stage.spectrogram())
    }

    pub fn frequency_of_bin(&self, bin: usize) -> f32 {
        bin_frequency(bin, self.config.sample_rate, self.config.fft_size)
    }

    pub fn bin_of_frequency(&self, freq: f32) -> usize {
        frequency_bin(freq, self.config.sample_rate, self.config.fft_size)
    }
}

impl Drop for EvpDetector {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FluxMode;
    use crate::core::source::SampleBufferSource;
    use crate::detection::EvpClass;
    use std::sync::{Arc, Mutex};

    const FFT: usize = 4096;
    const SR: u32 = 44100;

    /// Voice-like averaged spectrum: 150 Hz fundamental with harmonics,
    /// formant peaks at ~500 and ~1500 Hz, floor at -80 dB
    fn voiced_spectrum() -> Vec<f32> {
        let mut spectrum = vec![-80.0f32; FFT / 2];
        let f0 = bin_frequency(14, SR, FFT);
        spectrum[14] = -20.0;
        for n in 2..=5 {
            spectrum[frequency_bin(f0 * n as f32, SR, FFT)] = -35.0;
        }
        spectrum[frequency_bin(500.0, SR, FFT)] = -25.0;
        spectrum[frequency_bin(1500.0, SR, FFT)] = -25.0;
        spectrum
    }

    /// Alternating-sign block with a zero-crossing rate of ~0.05
    fn voiced_block() -> Vec<f32> {
        (0..FFT).map(|i| if (i / 20) % 2 == 0 { 0.3 } else { -0.3 }).collect()
    }

    fn voiced_frame() -> SpectralFrame {
        SpectralFrame::new(voiced_spectrum(), voiced_block())
    }

    fn silent_frame() -> SpectralFrame {
        SpectralFrame::new(vec![-100.0; FFT / 2], vec![0.0; FFT])
    }

    fn started() -> EvpDetector {
        let mut detector = EvpDetector::new(DetectionConfig::default()).unwrap();
        detector.start(None).unwrap();
        detector
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = DetectionConfig {
            min_frequency_hz: 100.0,
            max_frequency_hz: 50.0,
            ..Default::default()
        };
        assert!(matches!(EvpDetector::new(config), Err(EvpError::Config(_))));
    }

    #[test]
    fn test_update_config_rejects_inverted_range() {
        let mut detector = started();
        let before = detector.config().clone();
        let result = detector.update_config(ConfigUpdate::new().frequency_range(100.0, 50.0));
        assert!(matches!(result, Err(EvpError::Config(_))));
        assert_eq!(detector.config(), &before);
    }

    #[test]
    fn test_voiced_frame_scores_as_voice() {
        let mut detector = started();
        detector.process_frame(&voiced_frame(), 0);
        assert_eq!(detector.stats().buffer_size, 1);
        assert_eq!(detector.stats().voice_activity_rate, 1.0);
    }

    #[test]
    fn test_classification_fires_once_per_ten_frames() {
        let mut detector = started();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        detector.on_detection(move |d| sink.lock().unwrap().push(d.classification));

        let mut results = Vec::new();
        for i in 0..10 {
            results.push(detector.process_frame(&voiced_frame(), i * 16));
        }

        assert!(results[..9].iter().all(Option::is_none));
        let detection = results[9].clone().expect("tenth frame classifies");
        assert_eq!(detection.timestamp_ms, 144);
        assert_eq!(detector.stats().buffer_size, 0);
        assert_eq!(fired.lock().unwrap().len(), 1);
        assert_eq!(detector.stats().detections_emitted, 1);
    }

    #[test]
    fn test_buffer_resets_after_rejection() {
        let mut detector = started();
        detector
            .update_config(ConfigUpdate::new().classification_threshold(1.0))
            .unwrap();

        for i in 0..10 {
            assert!(detector.process_frame(&voiced_frame(), i).is_none());
        }
        assert_eq!(detector.stats().buffer_size, 0);
        assert_eq!(detector.stats().detections_emitted, 0);
    }

    #[test]
    fn test_silence_never_accumulates() {
        let mut detector = started();
        for i in 0..50 {
            detector.process_frame(&silent_frame(), i);
        }
        let stats = detector.stats();
        assert_eq!(stats.buffer_size, 0);
        assert_eq!(stats.voice_activity_rate, 0.0);
        assert_eq!(stats.frames_processed, 50);
    }

    #[test]
    fn test_noise_gate_blocks_voice() {
        let mut detector = started();
        detector
            .update_config(ConfigUpdate::new().noise_gate_threshold_db(-15.0))
            .unwrap();
        detector.process_frame(&voiced_frame(), 0);
        assert_eq!(detector.stats().buffer_size, 0);
    }

    #[test]
    fn test_interleaved_silence_keeps_buffer() {
        let mut detector = started();
        for i in 0..5 {
            detector.process_frame(&voiced_frame(), i);
            detector.process_frame(&silent_frame(), i);
        }
        let stats = detector.stats();
        assert_eq!(stats.buffer_size, 5);
        assert!((stats.voice_activity_rate - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_not_started_is_noop() {
        let mut detector = EvpDetector::new(DetectionConfig::default()).unwrap();
        assert!(detector.process_frame(&voiced_frame(), 0).is_none());
        assert!(detector.tick(0).is_none());
        assert_eq!(detector.stats().frames_processed, 0);
        assert!(!detector.stats().is_detecting);
    }

    #[test]
    fn test_start_is_idempotent_and_resets() {
        let mut detector = started();
        detector.process_frame(&voiced_frame(), 0);
        detector.start(Some(0.1)).unwrap();
        // Already running: nothing changes
        assert_eq!(detector.stats().buffer_size, 1);
        assert_eq!(detector.config().sensitivity, 0.7);

        detector.stop();
        detector.stop();
        assert_eq!(detector.state(), DetectorState::Idle);

        detector.start(Some(0.5)).unwrap();
        assert_eq!(detector.stats().buffer_size, 0);
        assert_eq!(detector.config().sensitivity, 0.5);
        assert!(detector.spectrogram().unwrap().is_empty());
    }

    #[test]
    fn test_start_rejects_bad_sensitivity() {
        let mut detector = EvpDetector::new(DetectionConfig::default()).unwrap();
        assert!(detector.start(Some(1.5)).is_err());
        assert_eq!(detector.state(), DetectorState::Idle);
    }

    #[test]
    fn test_dispose_then_tick_is_safe() {
        let mut detector = started();
        detector.on_detection(|_| panic!("observer must be cleared"));
        detector.dispose();
        detector.dispose();

        assert!(detector.tick(0).is_none());
        for i in 0..10 {
            assert!(detector.process_frame(&voiced_frame(), i).is_none());
        }
        assert!(detector.spectrogram().is_none());
        assert!(matches!(detector.start(None), Err(EvpError::Disposed)));
        assert!(matches!(
            detector.update_config(ConfigUpdate::new().sensitivity(0.5)),
            Err(EvpError::Disposed)
        ));
    }

    #[test]
    fn test_tick_without_source_reports_unavailable() {
        let mut detector = started();
        assert!(detector.tick(0).is_none());
        let stats = detector.stats();
        assert!(!stats.source_available);
        assert_eq!(stats.frames_processed, 1);
        assert_eq!(stats.buffer_size, 0);
    }

    #[test]
    fn test_tick_pulls_from_source() {
        let samples: Vec<f32> = (0..FFT * 4)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SR as f32).sin() * 0.5)
            .collect();
        let source = SampleBufferSource::new(samples, SR, FFT);
        let mut detector = EvpDetector::builder().source(source).build().unwrap();
        detector.start(None).unwrap();

        for i in 0..4 {
            detector.tick(i);
            assert!(detector.stats().source_available);
        }
        detector.tick(5);
        assert!(!detector.stats().source_available);
        assert_eq!(detector.spectrogram().unwrap().len(), 5);
    }

    #[test]
    fn test_fft_size_change_reallocates() {
        let mut detector = started();
        detector.process_frame(&voiced_frame(), 0);
        detector.update_config(ConfigUpdate::new().fft_size(2048)).unwrap();

        assert_eq!(detector.stats().buffer_size, 0);
        assert!(detector.spectrogram().unwrap().is_empty());
        // Old-sized frames are now rejected
        assert!(detector.process_frame(&voiced_frame(), 1).is_none());
        assert_eq!(detector.stats().frames_processed, 1);
        assert!((detector.frequency_of_bin(1) - SR as f32 / 2048.0).abs() < 1e-3);
    }

    #[test]
    fn test_attach_source_adopts_sample_rate() {
        let mut detector = started();
        detector
            .attach_source(SampleBufferSource::new(vec![0.0; 100], 48000, 800))
            .unwrap();
        assert_eq!(detector.config().sample_rate, 48000);
        assert_eq!(detector.bin_of_frequency(48000.0 / 4096.0 * 10.0), 10);
    }

    #[test]
    fn test_builder_preset_and_flux() {
        let detector = EvpDetector::builder()
            .preset(ConfigPreset::Strict)
            .build()
            .unwrap();
        assert_eq!(detector.config().sensitivity, 0.9);

        let mut detector = started();
        detector
            .update_config(ConfigUpdate::new().flux_mode(FluxMode::InterFrame))
            .unwrap();
        assert_eq!(detector.config().flux_mode, FluxMode::InterFrame);
    }

    #[test]
    fn test_voiced_segment_classification() {
        let mut detector = started();
        let mut last = None;
        for i in 0..10 {
            last = detector.process_frame(&voiced_frame(), i);
        }
        let detection = last.expect("voiced segment is reported");
        assert!(detection.snr_db > 20.0);
        assert!(detection.confidence >= 0.6);
        assert!(matches!(
            detection.classification,
            EvpClass::ClassA | EvpClass::ClassB
        ));
    }
}
