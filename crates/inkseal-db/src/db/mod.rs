//! Database repositories for data access layer
//!
//! Each repository is responsible for a specific domain entity. The lifecycle engine
//! only sees the traits, so PostgreSQL and in-memory backends are interchangeable.

mod audit;
mod document;
pub mod memory;

pub use audit::{AuditRepository, PostgresAuditRepository};
pub use document::{DocumentRepository, PostgresDocumentRepository};
