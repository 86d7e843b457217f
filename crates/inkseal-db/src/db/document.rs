use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkseal_core::models::{Document, DocumentStatus, SignaturePlacement};
use inkseal_core::AppError;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

/// Persistence boundary for document records.
///
/// `update` and `delete` are compare-and-swap operations on `Document::version`: a writer
/// that read a stale version loses with `AppError::Conflict`.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: &Document) -> Result<Document, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    /// Exact, case-sensitive match on the active share token.
    async fn find_by_token(&self, token: &str) -> Result<Option<Document>, AppError>;

    async fn token_exists(&self, token: &str) -> Result<bool, AppError>;

    /// Newest first.
    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        status: Option<DocumentStatus>,
    ) -> Result<Vec<Document>, AppError>;

    /// Persist `document` if the stored version still equals `document.version`.
    /// Returns the stored record with its version bumped.
    async fn update(&self, document: &Document) -> Result<Document, AppError>;

    async fn delete(&self, id: Uuid, expected_version: i64) -> Result<(), AppError>;
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    owner_id: Uuid,
    file_name: String,
    original_file_key: String,
    signed_file_key: Option<String>,
    status: DocumentStatus,
    external_signer_status: DocumentStatus,
    rejection_reason: Option<String>,
    share_token: Option<String>,
    token_issued_at: Option<DateTime<Utc>>,
    shared_with: Option<String>,
    signature_placement: Option<Json<SignaturePlacement>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            owner_id: row.owner_id,
            file_name: row.file_name,
            original_file_key: row.original_file_key,
            signed_file_key: row.signed_file_key,
            status: row.status,
            external_signer_status: row.external_signer_status,
            rejection_reason: row.rejection_reason,
            share_token: row.share_token,
            token_issued_at: row.token_issued_at,
            shared_with: row.shared_with,
            signature_placement: row.signature_placement.map(|Json(p)| p),
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

const DOCUMENT_COLUMNS: &str = "id, owner_id, file_name, original_file_key, signed_file_key, \
     status, external_signer_status, rejection_reason, share_token, token_issued_at, \
     shared_with, signature_placement, created_at, updated_at, version";

/// Map a unique violation on the share token index to a conflict.
fn map_write_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Share token already in use".to_string())
        }
        _ => AppError::Database(err),
    }
}

/// Repository for document records
#[derive(Clone)]
pub struct PostgresDocumentRepository {
    pool: PgPool,
}

impl PostgresDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl DocumentRepository for PostgresDocumentRepository {
    #[tracing::instrument(skip(self, document), fields(db.table = "documents", db.operation = "insert", db.record_id = %document.id))]
    async fn insert(&self, document: &Document) -> Result<Document, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentRow>(&format!(
            r#"
            INSERT INTO documents (
                id, owner_id, file_name, original_file_key, signed_file_key,
                status, external_signer_status, rejection_reason, share_token, token_issued_at,
                shared_with, signature_placement, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(document.id)
        .bind(document.owner_id)
        .bind(&document.file_name)
        .bind(&document.original_file_key)
        .bind(&document.signed_file_key)
        .bind(document.status)
        .bind(document.external_signer_status)
        .bind(&document.rejection_reason)
        .bind(&document.share_token)
        .bind(document.token_issued_at)
        .bind(&document.shared_with)
        .bind(document.signature_placement.map(Json))
        .bind(document.created_at)
        .bind(document.updated_at)
        .bind(document.version)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "documents", db.operation = "select"))]
    async fn find_by_token(&self, token: &str) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE share_token = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "documents", db.operation = "select"))]
    async fn token_exists(&self, token: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE share_token = $1)",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        status: Option<DocumentStatus>,
    ) -> Result<Vec<Document>, AppError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<Postgres, DocumentRow>(&format!(
                    "SELECT {} FROM documents WHERE owner_id = $1 AND status = $2 ORDER BY created_at DESC, id",
                    DOCUMENT_COLUMNS
                ))
                .bind(owner_id)
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<Postgres, DocumentRow>(&format!(
                    "SELECT {} FROM documents WHERE owner_id = $1 ORDER BY created_at DESC, id",
                    DOCUMENT_COLUMNS
                ))
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(skip(self, document), fields(db.table = "documents", db.operation = "update", db.record_id = %document.id, expected_version = document.version))]
    async fn update(&self, document: &Document) -> Result<Document, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentRow>(&format!(
            r#"
            UPDATE documents
            SET file_name = $3,
                signed_file_key = $4,
                status = $5,
                external_signer_status = $6,
                rejection_reason = $7,
                share_token = $8,
                token_issued_at = $9,
                shared_with = $10,
                signature_placement = $11,
                updated_at = $12,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(document.id)
        .bind(document.version)
        .bind(&document.file_name)
        .bind(&document.signed_file_key)
        .bind(document.status)
        .bind(document.external_signer_status)
        .bind(&document.rejection_reason)
        .bind(&document.share_token)
        .bind(document.token_issued_at)
        .bind(&document.shared_with)
        .bind(document.signature_placement.map(Json))
        .bind(document.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        match row {
            Some(row) => Ok(row.into()),
            None if self.exists(document.id).await? => {
                tracing::debug!(document_id = %document.id, "Stale document version");
                Err(AppError::Conflict(
                    "Document was modified concurrently".to_string(),
                ))
            }
            None => Err(AppError::NotFound("Document not found".to_string())),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid, expected_version: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(expected_version)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        if self.exists(id).await? {
            Err(AppError::Conflict(
                "Document was modified concurrently".to_string(),
            ))
        } else {
            Err(AppError::NotFound("Document not found".to_string()))
        }
    }
}
