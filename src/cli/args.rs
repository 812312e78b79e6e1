//! CLI argument parsing with preset support

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use std::path::PathBuf;

use crate::config::{ConfigPreset, ConfigUpdate, DetectionConfig};
use crate::core::dsp::WindowType;

/// Parsed CLI arguments
#[derive(Parser, Debug)]
#[command(name = "evpcheckr")]
#[command(version, about = "Scan audio files for EVP (electronic voice phenomena) events")]
pub struct Args {
    /// Input file or directory
    #[arg(required_unless_present = "list_presets")]
    pub input: Option<PathBuf>,

    /// Detection preset (standard, sensitive, strict)
    #[arg(short, long, default_value = "standard", value_parser = parse_preset)]
    pub preset: ConfigPreset,

    /// Voice activity threshold, 0.0 - 1.0
    #[arg(short, long)]
    pub sensitivity: Option<f32>,

    /// Minimum confidence for a detection to be reported, 0.0 - 1.0
    #[arg(long)]
    pub classification_threshold: Option<f32>,

    /// FFT size (power of two)
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Analysis window (hann, hamming, blackman, bartlett)
    #[arg(long, value_parser = parse_window)]
    pub window: Option<WindowType>,

    /// Samples advanced per tick (default: sample rate / 60)
    #[arg(long)]
    pub hop: Option<usize>,

    /// JSON configuration file
    #[arg(short, long, env = "EVPCHECKR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write a spectrogram PNG per file into this directory
    #[arg(long, value_name = "DIR")]
    pub spectrogram: Option<PathBuf>,

    /// Use a linear frequency axis for spectrograms
    #[arg(long, requires = "spectrogram")]
    pub linear: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Worker threads (default: one per core)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Verbose output with per-detection features
    #[arg(short, long)]
    pub verbose: bool,

    /// List available presets and exit
    #[arg(long)]
    pub list_presets: bool,
}

impl Args {
    /// Config file, then preset, then individual flags
    pub fn resolve_config(&self) -> Result<DetectionConfig> {
        let base = match &self.config {
            Some(path) => DetectionConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => match DetectionConfig::default_path().filter(|p| p.is_file()) {
                Some(path) => {
                    debug!("Using config file {}", path.display());
                    DetectionConfig::from_json_file(&path)
                        .with_context(|| format!("Failed to load config: {}", path.display()))?
                }
                None => DetectionConfig::default(),
            },
        };

        let preset = self.preset.apply(base);
        let merged = preset
            .merged(&self.overrides())
            .context("Invalid detection settings")?;
        Ok(merged)
    }

    fn overrides(&self) -> ConfigUpdate {
        let mut update = ConfigUpdate::new();
        if let Some(v) = self.sensitivity {
            update = update.sensitivity(v);
        }
        if let Some(v) = self.classification_threshold {
            update = update.classification_threshold(v);
        }
        if let Some(v) = self.fft_size {
            update = update.fft_size(v);
        }
        if let Some(v) = self.window {
            update = update.window_function(v);
        }
        update
    }
}

fn parse_preset(name: &str) -> Result<ConfigPreset, String> {
    ConfigPreset::from_name(name).ok_or_else(|| format!("Unknown preset: {}", name))
}

fn parse_window(name: &str) -> Result<WindowType, String> {
    WindowType::from_name(name).ok_or_else(|| format!("Unknown window: {}", name))
}

/// Print available presets
pub fn print_presets() {
    println!("Available detection presets:\n");

    for preset in ConfigPreset::all() {
        let config = DetectionConfig::from(preset);
        println!("  {} - {}", preset.name(), preset.description());
        println!("    Sensitivity: {:.2}", config.sensitivity);
        println!("    Classification threshold: {:.2}", config.classification_threshold);
        println!(
            "    Voice threshold: {:.0} dB, noise gate: {:.0} dB",
            config.voice_threshold_db, config.noise_gate_threshold_db
        );
        println!();
    }
}
