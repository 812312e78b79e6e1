//! Detection module for evpcheckr

mod result;

pub use result::{DetectorStats, EvpClass, EvpDetection};
