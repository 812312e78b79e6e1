//! Window function implementations

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Bartlett,
}

impl WindowType {
    pub fn all() -> [Self; 4] {
        [Self::Hann, Self::Hamming, Self::Blackman, Self::Bartlett]
    }

    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::Bartlett => "bartlett",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "hann" | "hanning" => Some(Self::Hann),
            "hamming" => Some(Self::Hamming),
            "blackman" => Some(Self::Blackman),
            "bartlett" | "triangular" => Some(Self::Bartlett),
            _ => None,
        }
    }
}

/// Create window function
pub fn create_window(size: usize, window_type: WindowType) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = i as f32;
            match window_type {
                WindowType::Hann => {
                    0.5 * (1.0 - (2.0 * PI * x / n).cos())
                }
                WindowType::Hamming => {
                    0.54 - 0.46 * (2.0 * PI * x / n).cos()
                }
                WindowType::Blackman => {
                    0.42 - 0.5 * (2.0 * PI * x / n).cos()
                        + 0.08 * (4.0 * PI * x / n).cos()
                }
                WindowType::Bartlett => {
                    1.0 - (2.0 * x / n - 1.0).abs()
                }
            }
        })
        .collect()
}

/// Precomputed coefficients for every supported window at one size.
///
/// Switching window type is a lookup; only a size change regenerates
/// the tables.
#[derive(Debug, Clone)]
pub struct WindowLibrary {
    size: usize,
    hann: Vec<f32>,
    hamming: Vec<f32>,
    blackman: Vec<f32>,
    bartlett: Vec<f32>,
}

impl WindowLibrary {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            hann: create_window(size, WindowType::Hann),
            hamming: create_window(size, WindowType::Hamming),
            blackman: create_window(size, WindowType::Blackman),
            bartlett: create_window(size, WindowType::Bartlett),
        }
    }

    pub fn get(&self, window_type: WindowType) -> &[f32] {
        match window_type {
            WindowType::Hann => &self.hann,
            WindowType::Hamming => &self.hamming,
            WindowType::Blackman => &self.blackman,
            WindowType::Bartlett => &self.bartlett,
        }
    }

    /// Regenerate all tables for a new size. No-op when the size is unchanged.
    pub fn resize(&mut self, size: usize) {
        if size != self.size {
            *self = Self::new(size);
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
