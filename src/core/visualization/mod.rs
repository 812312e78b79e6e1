//! Visualization of the rolling spectrogram

mod spectrogram;

pub use spectrogram::{render_spectrogram, save_spectrogram, Colormap, SpectrogramConfig};
