// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{print_presets, Args};
pub use output::{format_json, format_report, format_summary, format_timestamp};

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::core::decoder::is_supported_extension;

/// Audio files under `path`, sorted; a single supported file is returned as-is
pub fn collect_audio_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_supported_extension(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported_extension(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// PNG destination for each audio file, parallel to `files`.
///
/// Names follow the path relative to `input` with components joined by `_`,
/// so `night1/take1.wav` becomes `night1_take1.png`. Names that still clash
/// get a numeric suffix, keeping every destination distinct.
pub fn spectrogram_paths(out_dir: &Path, input: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    files
        .iter()
        .map(|file| {
            let base = spectrogram_name(input, file);
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            out_dir.join(format!("{}.png", name))
        })
        .collect()
}

fn spectrogram_name(input: &Path, file: &Path) -> String {
    let relative = match file.strip_prefix(input) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.with_extension(""),
        _ => PathBuf::from(file.file_stem().unwrap_or_default()),
    };
    let name = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_");

    if name.is_empty() {
        "spectrogram".to_string()
    } else {
        name
    }
}
