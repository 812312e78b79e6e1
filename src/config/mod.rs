//! Configuration module for evpcheckr

mod profiles;
mod settings;

pub use profiles::ConfigPreset;
pub use settings::{ConfigUpdate, DetectionConfig, FluxMode};
