// src/core/visualization/spectrogram.rs
//
// Renders the engine's rolling spectrogram (one dB half-spectrum per tick,
// oldest first) to an RGB image. Time runs left to right, low frequencies
// at the bottom.

use anyhow::{bail, Result};
use image::{ImageBuffer, Rgb, RgbImage};
use std::collections::VecDeque;
use std::path::Path;

use crate::core::analysis::{hz_to_mel, mel_to_hz};

/// Spectrogram rendering options
#[derive(Debug, Clone)]
pub struct SpectrogramConfig {
    pub width: u32,
    pub height: u32,
    pub min_db: f32,
    pub max_db: f32,
    pub mel_scale: bool,
    pub colormap: Colormap,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 400,
            min_db: -100.0,
            max_db: -10.0,
            mel_scale: true,
            colormap: Colormap::default(),
        }
    }
}

/// Color map for spectrogram
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Colormap {
    #[default]
    Viridis,
    Grayscale,
}

impl Colormap {
    /// Map a normalized 0-1 intensity to a pixel
    pub fn color(&self, value: f32) -> Rgb<u8> {
        let v = value.clamp(0.0, 1.0);
        match self {
            Colormap::Viridis => {
                let r = (68.0 + v * (235.0 - 68.0)) as u8;
                let g = (1.0 + v * (237.0 - 1.0)) as u8;
                let b = (84.0 + v * (32.0 - 84.0 + (1.0 - v) * 150.0)) as u8;
                Rgb([r, g, b])
            }
            Colormap::Grayscale => {
                let l = (v * 255.0) as u8;
                Rgb([l, l, l])
            }
        }
    }
}

/// Render spectrogram rows into an image of `config.width` x `config.height`
pub fn render_spectrogram(
    rows: &VecDeque<Vec<f32>>,
    sample_rate: u32,
    config: &SpectrogramConfig,
) -> Result<RgbImage> {
    let Some(bins) = rows.front().map(Vec::len) else {
        bail!("Spectrogram is empty");
    };
    if bins == 0 || config.width == 0 || config.height == 0 {
        bail!("Spectrogram has no drawable area");
    }
    if config.min_db >= config.max_db {
        bail!("Invalid dB range {}..{}", config.min_db, config.max_db);
    }

    let nyquist = sample_rate as f32 / 2.0;
    let nyquist_mel = hz_to_mel(nyquist);
    let x_scale = rows.len() as f32 / config.width as f32;
    let y_scale = bins as f32 / config.height as f32;
    let range = config.max_db - config.min_db;

    // Row lookup per y, computed once
    let bin_for_y: Vec<usize> = (0..config.height)
        .map(|y| {
            let from_bottom = config.height - 1 - y;
            let bin = if config.mel_scale {
                let mel = from_bottom as f32 / config.height as f32 * nyquist_mel;
                (mel_to_hz(mel) / nyquist * bins as f32) as usize
            } else {
                (from_bottom as f32 * y_scale) as usize
            };
            bin.min(bins - 1)
        })
        .collect();

    let mut img: RgbImage = ImageBuffer::new(config.width, config.height);

    for x in 0..config.width {
        let row_idx = ((x as f32 * x_scale) as usize).min(rows.len() - 1);
        let row = &rows[row_idx];

        for (y, &bin) in bin_for_y.iter().enumerate() {
            let db = row.get(bin).copied().unwrap_or(config.min_db);
            let normalized = (db - config.min_db) / range;
            img.put_pixel(x, y as u32, config.colormap.color(normalized));
        }
    }

    Ok(img)
}

/// Render and write to `output_path`; the format follows the extension
pub fn save_spectrogram(
    rows: &VecDeque<Vec<f32>>,
    sample_rate: u32,
    config: &SpectrogramConfig,
    output_path: &Path,
) -> Result<()> {
    let img = render_spectrogram(rows, sample_rate, config)?;
    img.save(output_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(count: usize, bins: usize, db: f32) -> VecDeque<Vec<f32>> {
        (0..count).map(|_| vec![db; bins]).collect()
    }

    #[test]
    fn test_empty_spectrogram_errors() {
        let config = SpectrogramConfig::default();
        assert!(render_spectrogram(&VecDeque::new(), 44100, &config).is_err());
    }

    #[test]
    fn test_render_dimensions() {
        let config = SpectrogramConfig {
            width: 64,
            height: 32,
            ..Default::default()
        };
        let img = render_spectrogram(&rows(10, 128, -50.0), 44100, &config).unwrap();
        assert_eq!(img.dimensions(), (64, 32));
    }

    #[test]
    fn test_loud_bins_are_brighter() {
        let config = SpectrogramConfig {
            width: 4,
            height: 16,
            mel_scale: false,
            colormap: Colormap::Grayscale,
            ..Default::default()
        };
        let mut data = rows(4, 16, -100.0);
        for row in data.iter_mut() {
            row[0] = -10.0;
        }
        let img = render_spectrogram(&data, 44100, &config).unwrap();
        // Bin 0 is drawn on the bottom row
        assert_eq!(img.get_pixel(0, 15), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.png");
        let config = SpectrogramConfig {
            width: 16,
            height: 16,
            ..Default::default()
        };
        save_spectrogram(&rows(3, 64, -40.0), 44100, &config, &path).unwrap();
        assert!(path.exists());
    }
}
