// tests/test_utils/mod.rs
//
// Synthetic signal generators shared by the integration tests.

#![allow(dead_code)]

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

pub const SAMPLE_RATE: u32 = 44100;

/// Fundamental of the voice-like test signal
pub const VOICE_F0_HZ: f32 = 150.0;

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_evpcheckr"))
}

/// Harmonic tone on a 150 Hz fundamental with boosted 3rd and 11th
/// partials standing in for first and second formants
pub fn generate_voice_like(duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let partials: [(u32, f32); 12] = [
        (1, 0.3),
        (2, 0.1),
        (3, 0.18),
        (4, 0.05),
        (5, 0.02),
        (6, 0.02),
        (7, 0.02),
        (8, 0.02),
        (9, 0.02),
        (10, 0.02),
        (11, 0.18),
        (12, 0.02),
    ];
    let len = (duration_secs * sample_rate as f32) as usize;

    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            partials
                .iter()
                .map(|&(n, amp)| amp * (2.0 * PI * VOICE_F0_HZ * n as f32 * t).sin())
                .sum::<f32>()
        })
        .collect()
}

pub fn generate_sine(freq: f32, amplitude: f32, duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let len = (duration_secs * sample_rate as f32) as usize;
    (0..len)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

pub fn generate_silence(duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    vec![0.0; (duration_secs * sample_rate as f32) as usize]
}

/// Deterministic uniform white noise in [-amplitude, amplitude]
pub fn generate_noise(amplitude: f32, duration_secs: f32, sample_rate: u32, seed: u64) -> Vec<f32> {
    let mut state = seed.max(1);
    let len = (duration_secs * sample_rate as f32) as usize;
    (0..len)
        .map(|_| {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            amplitude * (unit as f32 * 2.0 - 1.0)
        })
        .collect()
}

/// Write interleaved f32 samples as 16-bit PCM
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(v).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Duplicate a mono signal into interleaved stereo
pub fn to_stereo(mono: &[f32]) -> Vec<f32> {
    mono.iter().flat_map(|&s| [s, s]).collect()
}
