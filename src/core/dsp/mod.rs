//! Digital Signal Processing utilities
//!
//! - `windows` - analysis window tables (Hann, Hamming, Blackman, Bartlett)
//! - `fft` - windowed real FFT producing clipped dB frames
//! - `stats` - dB conversions, peak picking and band energy helpers

pub mod fft;
pub mod stats;
pub mod windows;

pub use fft::{SpectralFrame, SpectralTransformStage};
pub use stats::SpectralPeak;
pub use windows::{create_window, WindowLibrary, WindowType};
