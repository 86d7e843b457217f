//! Inkseal persistence layer
//!
//! Repository traits for documents and the audit trail, their PostgreSQL implementations,
//! and in-memory implementations used by tests and local tooling.

pub mod db;

pub use db::memory::{InMemoryAuditRepository, InMemoryDocumentRepository};
pub use db::{
    AuditRepository, DocumentRepository, PostgresAuditRepository, PostgresDocumentRepository,
};

/// Embedded migrations from the workspace `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
