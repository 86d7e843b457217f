//! Append-only history of lifecycle events.

use inkseal_core::models::{AuditEntry, AuditQuery, NewAuditEntry};
use inkseal_core::{AppError, Clock};
use inkseal_db::{AuditRepository, DocumentRepository};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditTrail {
    documents: Arc<dyn DocumentRepository>,
    entries: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl AuditTrail {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        entries: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            documents,
            entries,
            clock,
        }
    }

    /// Record `entry`. The referenced document must exist at this moment.
    #[tracing::instrument(skip(self, entry), fields(document_id = %entry.document_id, action = ?entry.action))]
    pub async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError> {
        if self.documents.get(entry.document_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Document {} not found",
                entry.document_id
            )));
        }
        self.entries.append(entry, self.clock.now()).await
    }

    /// Entries for `document_id`, newest first. Works after the document is deleted.
    pub async fn list_for(
        &self,
        document_id: Uuid,
        query: AuditQuery,
    ) -> Result<Vec<AuditEntry>, AppError> {
        self.entries
            .list_for_document(document_id, query.limit(), query.offset())
            .await
    }
}
