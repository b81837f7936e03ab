//! Port traits: the seams between the pipeline and the outside world.

pub mod band_export_port;
pub mod cache_port;
pub mod config_port;
pub mod listing_port;
