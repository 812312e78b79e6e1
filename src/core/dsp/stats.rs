//! Statistical and spectral helper functions
//!
//! Spectra handled here are half-spectra in dB, so a slice of `len` bins
//! belongs to a transform of size `2 * len`.

/// Floor used when converting silent magnitudes to dB
pub const SILENCE_DB: f32 = -200.0;

/// Guard added to denominators and log arguments
pub const EPSILON: f32 = 1e-10;

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Compute peak amplitude
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Convert amplitude to dB (relative to 1.0)
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude > EPSILON {
        20.0 * amplitude.log10()
    } else {
        SILENCE_DB
    }
}

/// Convert dB to amplitude
pub fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Value at the given percentile of the ascending-sorted data.
///
/// Uses the lower index `floor(len * p)`; no interpolation.
pub fn percentile(data: &[f32], p: f32) -> f32 {
    if data.is_empty() {
        return 0.0;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let idx = ((sorted.len() as f32 * p.clamp(0.0, 1.0)) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Zero-crossing rate
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings: usize = samples.windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();

    crossings as f32 / (samples.len() - 1) as f32
}

/// Centre frequency of a bin: `bin * sample_rate / fft_size`
pub fn bin_frequency(bin: usize, sample_rate: u32, fft_size: usize) -> f32 {
    if fft_size == 0 {
        return 0.0;
    }
    bin as f32 * sample_rate as f32 / fft_size as f32
}

/// Slack added before flooring so `n * bin_frequency(k)` maps back to bin `n * k`
const BIN_SNAP: f32 = 1e-2;

/// Bin containing a frequency: `floor(freq * fft_size / sample_rate)`
pub fn frequency_bin(freq: f32, sample_rate: u32, fft_size: usize) -> usize {
    if sample_rate == 0 || freq <= 0.0 {
        return 0;
    }
    (freq * fft_size as f32 / sample_rate as f32 + BIN_SNAP).floor() as usize
}

/// A local maximum in a dB spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub bin: usize,
    pub frequency: f32,
    pub magnitude_db: f32,
}

/// Find local maxima above `threshold_db`, scanning upwards in frequency.
///
/// A candidate closer than `min_distance` bins to the previously accepted
/// peak is skipped.
pub fn find_peaks(
    spectrum_db: &[f32],
    sample_rate: u32,
    threshold_db: f32,
    min_distance: usize,
) -> Vec<SpectralPeak> {
    let fft_size = spectrum_db.len() * 2;
    let mut peaks: Vec<SpectralPeak> = Vec::new();

    if spectrum_db.len() < 3 {
        return peaks;
    }

    for i in 1..spectrum_db.len() - 1 {
        let value = spectrum_db[i];
        if value <= threshold_db || value <= spectrum_db[i - 1] || value <= spectrum_db[i + 1] {
            continue;
        }

        if let Some(last) = peaks.last() {
            if i - last.bin < min_distance {
                continue;
            }
        }

        peaks.push(SpectralPeak {
            bin: i,
            frequency: bin_frequency(i, sample_rate, fft_size),
            magnitude_db: value,
        });
    }

    peaks
}

/// Energy of a frequency band in dB: `20 * log10(sum of linear magnitudes)`.
///
/// Bin bounds are clamped to the spectrum; an empty band reports `SILENCE_DB`.
pub fn band_energy_db(spectrum_db: &[f32], sample_rate: u32, low_hz: f32, high_hz: f32) -> f32 {
    let fft_size = spectrum_db.len() * 2;
    let start = frequency_bin(low_hz, sample_rate, fft_size);
    let end = frequency_bin(high_hz, sample_rate, fft_size).min(spectrum_db.len().saturating_sub(1));

    if spectrum_db.is_empty() || start > end {
        return SILENCE_DB;
    }

    let sum: f32 = spectrum_db[start..=end].iter().map(|&db| db_to_amplitude(db)).sum();
    20.0 * (sum + EPSILON).log10()
}
