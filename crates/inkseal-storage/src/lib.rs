//! Inkseal Storage Library
//!
//! This crate provides the storage abstraction for document bytes and its implementations
//! for S3 and the local filesystem.
//!
//! # Storage key format
//!
//! Keys are generated by the service, never taken from user input:
//!
//! - **Original upload**: `documents/{owner_id}/{document_id}/original.pdf`
//! - **Signed variant**: `documents/{owner_id}/{document_id}/signed-{revision}.pdf`
//!
//! Every signature writes a fresh signed key so a committed record never points at bytes
//! that are being overwritten. Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use inkseal_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
