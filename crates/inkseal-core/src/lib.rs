//! Inkseal Core Library
//!
//! This crate provides the domain models, error types, configuration and clock abstraction
//! shared across all Inkseal components.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BaseConfig, Config, SigningConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
// Note: Storage, StorageError, StorageResult live in the inkseal-storage crate
