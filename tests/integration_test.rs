// tests/integration_test.rs
//
// End-to-end tests driving the engine with synthetic signals, through the
// in-memory source, the file analyzer and the binary.

mod test_utils;

use std::process::Command;
use std::sync::{Arc, Mutex};

use evpcheckr::core::scan_samples;
use evpcheckr::{
    AudioAnalyzer, ConfigPreset, ConfigUpdate, DetectionConfig, DetectorState, EvpClass,
    EvpDetector, EvpError, SampleBufferSource,
};
use test_utils::*;

const HOP: usize = 735;

fn voice_config() -> DetectionConfig {
    DetectionConfig::default()
}

#[test]
fn test_voice_like_signal_is_detected() {
    let samples = generate_voice_like(3.0, SAMPLE_RATE);
    let scan = scan_samples(samples, voice_config(), HOP).unwrap();

    assert!(!scan.detections.is_empty(), "expected at least one detection");
    assert!(scan.stats.voice_activity_rate > 0.9);

    for detection in &scan.detections {
        assert!(detection.confidence >= 0.6);
        assert!(detection.snr_db > 10.0);
        assert!(matches!(
            detection.classification,
            EvpClass::ClassA | EvpClass::ClassB
        ));
        assert!((detection.dominant_frequency_hz - VOICE_F0_HZ).abs() < 15.0);
        assert_eq!(detection.features.mfcc.len(), 13);
    }

    // One detection per ten voice frames, never more
    assert!(scan.detections.len() as u64 <= scan.stats.frames_processed / 10);
    assert_eq!(scan.stats.detections_emitted, scan.detections.len() as u64);
}

#[test]
fn test_detection_timestamps_increase() {
    let samples = generate_voice_like(3.0, SAMPLE_RATE);
    let scan = scan_samples(samples, voice_config(), HOP).unwrap();

    let stamps: Vec<i64> = scan.detections.iter().map(|d| d.timestamp_ms).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    assert!(stamps.iter().all(|&t| (0..=3000).contains(&t)));
}

#[test]
fn test_silence_produces_nothing() {
    let scan = scan_samples(generate_silence(2.0, SAMPLE_RATE), voice_config(), HOP).unwrap();
    assert!(scan.detections.is_empty());
    assert_eq!(scan.stats.voice_activity_rate, 0.0);
    assert_eq!(scan.stats.buffer_size, 0);
}

#[test]
fn test_white_noise_is_not_voice() {
    let noise = generate_noise(0.3, 2.0, SAMPLE_RATE, 0x5eed);
    let scan = scan_samples(noise, voice_config(), HOP).unwrap();
    assert!(scan.detections.is_empty());
    assert_eq!(scan.stats.voice_activity_rate, 0.0);
}

#[test]
fn test_observers_receive_every_detection() {
    let samples = generate_voice_like(2.0, SAMPLE_RATE);
    let source = SampleBufferSource::new(samples, SAMPLE_RATE, HOP);
    let ticks = source.tick_count();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let order = Arc::new(Mutex::new(Vec::new()));
    let (seen_a, order_a, order_b) = (Arc::clone(&seen), Arc::clone(&order), Arc::clone(&order));

    let mut detector = EvpDetector::builder()
        .source(source)
        .on_detection(move |d| {
            seen_a.lock().unwrap().push(d.id);
            order_a.lock().unwrap().push('a');
        })
        .on_detection(move |_| order_b.lock().unwrap().push('b'))
        .build()
        .unwrap();

    detector.start(None).unwrap();
    let mut returned = Vec::new();
    for tick in 0..ticks {
        if let Some(d) = detector.tick(tick as i64 * 16) {
            returned.push(d.id);
        }
    }

    assert!(!returned.is_empty());
    assert_eq!(*seen.lock().unwrap(), returned);
    let order = order.lock().unwrap();
    assert!(order.chunks(2).all(|pair| pair == ['a', 'b']));
}

#[test]
fn test_lifecycle_through_public_api() {
    let samples = generate_voice_like(1.0, SAMPLE_RATE);
    let mut detector = EvpDetector::new(voice_config()).unwrap();
    detector
        .attach_source(SampleBufferSource::new(samples, SAMPLE_RATE, HOP))
        .unwrap();

    assert_eq!(detector.state(), DetectorState::Idle);
    assert!(detector.tick(0).is_none());

    detector.start(Some(0.6)).unwrap();
    assert!(detector.is_detecting());
    for tick in 0..5 {
        detector.tick(tick * 16);
    }
    assert_eq!(detector.stats().frames_processed, 5);

    detector.stop();
    assert!(detector.tick(100).is_none());
    assert_eq!(detector.stats().frames_processed, 5);

    detector.dispose();
    assert_eq!(detector.state(), DetectorState::Disposed);
    assert!(detector.tick(200).is_none());
    assert!(matches!(detector.start(None), Err(EvpError::Disposed)));
}

#[test]
fn test_invalid_update_keeps_running_config() {
    let mut detector = EvpDetector::new(voice_config()).unwrap();
    detector.start(None).unwrap();

    assert!(detector
        .update_config(ConfigUpdate::new().frequency_range(100.0, 50.0))
        .is_err());
    assert!(detector.update_config(ConfigUpdate::new().fft_size(3000)).is_err());
    assert_eq!(detector.config(), &voice_config());

    detector
        .update_config(ConfigUpdate::new().fft_size(2048).sensitivity(0.5))
        .unwrap();
    assert_eq!(detector.config().fft_size, 2048);
    assert_eq!(detector.config().sensitivity, 0.5);
}

#[test]
fn test_strict_preset_never_reports_more() {
    let samples = generate_voice_like(3.0, SAMPLE_RATE);
    let standard = scan_samples(samples.clone(), voice_config(), HOP).unwrap();
    let strict = scan_samples(samples, ConfigPreset::Strict.into(), HOP).unwrap();
    assert!(strict.detections.len() <= standard.detections.len());
}

#[test]
fn test_analyze_wav_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.wav");
    let mono = generate_voice_like(3.0, SAMPLE_RATE);
    write_wav(&path, &to_stereo(&mono), SAMPLE_RATE, 2);

    let report = AudioAnalyzer::new(&path).unwrap().analyze().unwrap();

    assert_eq!(report.sample_rate, SAMPLE_RATE);
    assert_eq!(report.channels, 2);
    assert_eq!(report.hop_size, (SAMPLE_RATE / 60) as usize);
    assert!((report.duration_secs - 3.0).abs() < 0.01);
    assert!(!report.detections.is_empty());
    assert!(!report.spectrogram.is_empty());
    assert!(!report.stats.is_detecting);
}

#[test]
fn test_analyze_follows_file_sample_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quiet.wav");
    write_wav(&path, &generate_silence(1.0, 48000), 48000, 1);

    let analyzer = AudioAnalyzer::builder().hop_size(800).build(&path).unwrap();
    let report = analyzer.analyze().unwrap();
    assert_eq!(report.sample_rate, 48000);
    assert_eq!(report.ticks, 60);
    assert!(report.detections.is_empty());
}

#[test]
fn test_cli_json_output() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(
        &dir.path().join("voice.wav"),
        &generate_voice_like(2.0, SAMPLE_RATE),
        SAMPLE_RATE,
        1,
    );
    write_wav(
        &dir.path().join("silence.wav"),
        &generate_silence(1.0, SAMPLE_RATE),
        SAMPLE_RATE,
        1,
    );

    let output = Command::new(get_binary_path())
        .arg(dir.path())
        .arg("--json")
        .env_remove("EVPCHECKR_CONFIG")
        .output()
        .expect("Failed to execute evpcheckr");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 2);

    let detections = |name: &str| {
        reports
            .iter()
            .find(|r| r["file"]["path"].as_str().unwrap().ends_with(name))
            .map(|r| r["detections"].as_array().unwrap().len())
            .unwrap()
    };
    assert_eq!(detections("silence.wav"), 0);
    assert!(detections("voice.wav") > 0);
}

#[test]
fn test_cli_spectrogram_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("take.wav");
    let out = dir.path().join("png");
    write_wav(&input, &generate_sine(440.0, 0.5, 1.0, SAMPLE_RATE), SAMPLE_RATE, 1);

    let output = Command::new(get_binary_path())
        .arg(&input)
        .arg("--spectrogram")
        .arg(&out)
        .env_remove("EVPCHECKR_CONFIG")
        .output()
        .expect("Failed to execute evpcheckr");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(out.join("take.png").exists());
}

#[test]
fn test_cli_spectrograms_keep_same_named_files_apart() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("sessions");
    let out = dir.path().join("png");
    for night in ["night1", "night2"] {
        std::fs::create_dir_all(input.join(night)).unwrap();
        write_wav(
            &input.join(night).join("take1.wav"),
            &generate_sine(440.0, 0.5, 0.5, SAMPLE_RATE),
            SAMPLE_RATE,
            1,
        );
    }

    let output = Command::new(get_binary_path())
        .arg(&input)
        .arg("--spectrogram")
        .arg(&out)
        .env_remove("EVPCHECKR_CONFIG")
        .output()
        .expect("Failed to execute evpcheckr");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    assert!(out.join("night1_take1.png").exists());
    assert!(out.join("night2_take1.png").exists());
    assert!(!out.join("take1.png").exists());
}

#[test]
fn test_cli_rejects_invalid_sensitivity() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("take.wav");
    write_wav(&input, &generate_silence(0.5, SAMPLE_RATE), SAMPLE_RATE, 1);

    let output = Command::new(get_binary_path())
        .arg(&input)
        .args(["--sensitivity", "1.5"])
        .env_remove("EVPCHECKR_CONFIG")
        .output()
        .expect("Failed to execute evpcheckr");
    assert!(!output.status.success());
}
