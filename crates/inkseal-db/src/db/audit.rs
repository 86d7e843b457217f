use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkseal_core::models::{AuditEntry, NewAuditEntry};
use inkseal_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Append-only store of lifecycle events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(
        &self,
        entry: NewAuditEntry,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry, AppError>;

    /// Newest first; entries sharing a timestamp come back in reverse insertion order.
    async fn list_for_document(
        &self,
        document_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, AppError>;
}

#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    #[tracing::instrument(skip(self, entry), fields(
        db.table = "audit_entries",
        db.operation = "insert",
        document_id = %entry.document_id,
        action = ?entry.action
    ))]
    async fn append(
        &self,
        entry: NewAuditEntry,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry, AppError> {
        let stored = sqlx::query_as::<Postgres, AuditEntry>(
            r#"
            INSERT INTO audit_entries (id, document_id, action, actor, origin, created_at, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, document_id, action, actor, origin, created_at, details
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.document_id)
        .bind(entry.action)
        .bind(&entry.actor)
        .bind(&entry.origin)
        .bind(at)
        .bind(&entry.details)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, document_id = %entry.document_id, "Failed to append audit entry");
            AppError::Database(e)
        })?;

        Ok(stored)
    }

    #[tracing::instrument(skip(self), fields(db.table = "audit_entries", db.operation = "select"))]
    async fn list_for_document(
        &self,
        document_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let entries = sqlx::query_as::<Postgres, AuditEntry>(
            r#"
            SELECT id, document_id, action, actor, origin, created_at, details
            FROM audit_entries
            WHERE document_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(document_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
