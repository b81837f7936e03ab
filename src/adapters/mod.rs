//! Concrete adapter implementations for ports.

pub mod cached_store;
pub mod csv_adapter;
pub mod csv_export_adapter;
pub mod file_config_adapter;
pub mod memory_cache;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
