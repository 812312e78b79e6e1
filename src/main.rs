// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use colorful::Colorful;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use evpcheckr::cli::{self, Args};
use evpcheckr::core::visualization::{save_spectrogram, SpectrogramConfig};
use evpcheckr::core::{AudioAnalyzer, ScanReport};
use evpcheckr::DetectionConfig;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if args.list_presets {
        cli::print_presets();
        return Ok(());
    }

    let input = args.input.as_deref().context("No input given")?;
    let config = args.resolve_config()?;

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker pool")?;
    }

    if let Some(dir) = &args.spectrogram {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let audio_files = cli::collect_audio_files(input);

    if audio_files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }

    if !args.json {
        println!("Found {} audio file(s)\n", audio_files.len());
    }

    let progress = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(audio_files.len() as u64)
    };
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {elapsed_precise}")?
            .progress_chars("=> "),
    );

    let png_paths: Vec<Option<PathBuf>> = match &args.spectrogram {
        Some(dir) => cli::spectrogram_paths(dir, input, &audio_files)
            .into_iter()
            .map(Some)
            .collect(),
        None => vec![None; audio_files.len()],
    };

    let results: Vec<(PathBuf, Option<PathBuf>, Result<ScanReport>)> = audio_files
        .par_iter()
        .zip(png_paths.par_iter())
        .progress_with(progress.clone())
        .map(|(path, png)| {
            let result = process_file(path, png.as_deref(), &args, &config);
            (path.clone(), png.clone(), result)
        })
        .collect();
    progress.finish_and_clear();

    let mut reports = Vec::with_capacity(results.len());
    let mut failed = 0;
    let mut saved = Vec::with_capacity(results.len());
    for (path, png, result) in results {
        match result {
            Ok(report) => {
                saved.push(png.filter(|p| p.exists()));
                reports.push(report);
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {:#}", "✗".red(), path.display(), e);
            }
        }
    }

    if args.json {
        println!("{}", cli::format_json(&reports)?);
        return Ok(());
    }

    for (report, png) in reports.iter().zip(&saved) {
        println!("{}", cli::format_report(report, args.verbose));
        if let Some(png) = png {
            println!("  Spectrogram saved to: {}\n", png.display().to_string().cyan());
        }
    }

    if reports.len() + failed > 1 {
        println!("{}", cli::format_summary(&reports, failed));
    }

    Ok(())
}

fn process_file(
    path: &Path,
    png: Option<&Path>,
    args: &Args,
    config: &DetectionConfig,
) -> Result<ScanReport> {
    let mut builder = AudioAnalyzer::builder().config(config.clone());
    if let Some(hop) = args.hop {
        builder = builder.hop_size(hop);
    }

    let report = builder
        .build(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?
        .analyze()?;

    if let Some(png) = png {
        if !report.spectrogram.is_empty() {
            let render = SpectrogramConfig {
                min_db: config.min_db,
                max_db: config.max_db,
                mel_scale: !args.linear,
                ..Default::default()
            };
            save_spectrogram(&report.spectrogram, report.sample_rate, &render, png)?;
        }
    }

    Ok(report)
}
