//! Core domain types and the banding pipeline.

pub mod listing;
pub mod filter;
pub mod sample_window;
pub mod outlier;
pub mod kmeans;
pub mod band;
pub mod band_metrics;
pub mod alignment;
pub mod format;
pub mod analysis;
pub mod config_validation;
pub mod error;
