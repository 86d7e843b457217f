//! In-memory repository implementations
//!
//! Same contracts as the PostgreSQL repositories (version CAS, unique share tokens,
//! newest-first audit reads) without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkseal_core::models::{AuditEntry, Document, DocumentStatus, NewAuditEntry};
use inkseal_core::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{AuditRepository, DocumentRepository};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentRepository {
    documents: Arc<Mutex<HashMap<Uuid, Document>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.documents).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn token_taken_by_other(
        documents: &HashMap<Uuid, Document>,
        id: Uuid,
        token: Option<&str>,
    ) -> bool {
        match token {
            Some(token) => documents
                .values()
                .any(|d| d.id != id && d.share_token.as_deref() == Some(token)),
            None => false,
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn insert(&self, document: &Document) -> Result<Document, AppError> {
        let mut documents = lock(&self.documents);
        if documents.contains_key(&document.id) {
            return Err(AppError::Conflict("Document already exists".to_string()));
        }
        if Self::token_taken_by_other(&documents, document.id, document.share_token.as_deref()) {
            return Err(AppError::Conflict("Share token already in use".to_string()));
        }
        documents.insert(document.id, document.clone());
        Ok(document.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(lock(&self.documents).get(&id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Document>, AppError> {
        Ok(lock(&self.documents)
            .values()
            .find(|d| d.share_token.as_deref() == Some(token))
            .cloned())
    }

    async fn token_exists(&self, token: &str) -> Result<bool, AppError> {
        Ok(lock(&self.documents)
            .values()
            .any(|d| d.share_token.as_deref() == Some(token)))
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        status: Option<DocumentStatus>,
    ) -> Result<Vec<Document>, AppError> {
        let mut docs: Vec<Document> = lock(&self.documents)
            .values()
            .filter(|d| d.owner_id == owner_id)
            .filter(|d| status.map_or(true, |s| d.status == s))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn update(&self, document: &Document) -> Result<Document, AppError> {
        let mut documents = lock(&self.documents);
        let current_version = match documents.get(&document.id) {
            Some(current) => current.version,
            None => return Err(AppError::NotFound("Document not found".to_string())),
        };
        if current_version != document.version {
            return Err(AppError::Conflict(
                "Document was modified concurrently".to_string(),
            ));
        }
        if Self::token_taken_by_other(&documents, document.id, document.share_token.as_deref()) {
            return Err(AppError::Conflict("Share token already in use".to_string()));
        }

        let mut stored = document.clone();
        stored.version += 1;
        documents.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: Uuid, expected_version: i64) -> Result<(), AppError> {
        let mut documents = lock(&self.documents);
        match documents.get(&id) {
            None => Err(AppError::NotFound("Document not found".to_string())),
            Some(current) if current.version != expected_version => Err(AppError::Conflict(
                "Document was modified concurrently".to_string(),
            )),
            Some(_) => {
                documents.remove(&id);
                Ok(())
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAuditRepository {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in insertion order.
    pub fn all(&self) -> Vec<AuditEntry> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(
        &self,
        entry: NewAuditEntry,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry, AppError> {
        let stored = AuditEntry {
            id: Uuid::new_v4(),
            document_id: entry.document_id,
            action: entry.action,
            actor: entry.actor,
            origin: entry.origin,
            created_at: at,
            details: entry.details,
        };
        lock(&self.entries).push(stored.clone());
        Ok(stored)
    }

    async fn list_for_document(
        &self,
        document_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let entries = lock(&self.entries);
        // Insertion index is the tiebreaker, like `seq` in the database.
        let mut matching: Vec<(usize, &AuditEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.document_id == document_id)
            .collect();
        matching.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));

        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(_, e)| e.clone())
            .collect())
    }
}
