//! Document signing lifecycle.
//!
//! Owns every status transition and its side effects. Each mutating operation runs under the
//! document's in-process lock and commits through the repository's version check, so a racing
//! writer in another process loses with `Conflict`.
//!
//! Signing order: write the new bytes to a fresh key, swap the record to reference that key,
//! append the audit entry, then delete the superseded blob. A failed swap deletes the fresh blob.

use chrono::{DateTime, Utc};
use inkseal_core::constants::{EXTERNAL_SIGN_PATH, PDF_CONTENT_TYPE};
use inkseal_core::models::{
    Actor, AuditAction, AuditEntry, AuditQuery, Document, DocumentStatus, ExternalDocumentView,
    FileVariant, NewAuditEntry, ScreenPlacement, SignaturePlacement,
};
use inkseal_core::{AppError, Clock, Config};
use inkseal_db::{AuditRepository, DocumentRepository};
use inkseal_processing::{
    embed_signature, inspect, map_to_page_space, sanitize_file_name, PdfInfo, PdfValidator,
};
use inkseal_storage::keys::{original_key, signed_key};
use inkseal_storage::Storage;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::audit_trail::AuditTrail;
use crate::locks::DocumentLocks;
use crate::notification::{Notification, Notifier};
use crate::share_token::ShareTokens;

/// Knobs the lifecycle needs from configuration.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Origin of the signing UI; share links are `{client_url}/external-sign/{token}`.
    pub client_url: String,
    pub max_document_size_bytes: usize,
    pub notification_timeout: Duration,
}

impl LifecycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_url: config.client_url().to_string(),
            max_document_size_bytes: config.max_document_size_bytes(),
            notification_timeout: Duration::from_secs(config.notification_timeout_secs()),
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            client_url: "http://localhost:5173".to_string(),
            max_document_size_bytes: inkseal_core::constants::DEFAULT_MAX_DOCUMENT_SIZE_BYTES,
            notification_timeout: Duration::from_secs(10),
        }
    }
}

/// How the signature arrives.
#[derive(Debug, Clone)]
pub enum SignaturePayload {
    /// The client already stamped the PDF; `placement` is where it drew the signature on the
    /// rendered first page.
    Rendered {
        pdf: Vec<u8>,
        placement: ScreenPlacement,
    },
    /// Stamp `signature_png` onto the stored original at `placement`.
    Stamp {
        signature_png: Vec<u8>,
        placement: ScreenPlacement,
    },
}

impl SignaturePayload {
    fn mode(&self) -> &'static str {
        match self {
            SignaturePayload::Rendered { .. } => "rendered",
            SignaturePayload::Stamp { .. } => "stamp",
        }
    }
}

/// Bytes of one stored variant.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Outcome of a share.
#[derive(Debug, Clone)]
pub struct SharedDocument {
    pub document: Document,
    pub sign_link: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DocumentLifecycle {
    documents: Arc<dyn DocumentRepository>,
    storage: Arc<dyn Storage>,
    audit: AuditTrail,
    tokens: ShareTokens,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    locks: DocumentLocks,
    settings: LifecycleSettings,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Document {} not found", id))
}

fn variant_file_name(doc: &Document, variant: FileVariant) -> String {
    match variant {
        FileVariant::Original => doc.file_name.clone(),
        FileVariant::Signed => format!("signed-{}", doc.file_name),
    }
}

impl DocumentLifecycle {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        audit_entries: Arc<dyn AuditRepository>,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            audit: AuditTrail::new(documents.clone(), audit_entries, clock.clone()),
            tokens: ShareTokens::new(documents.clone(), clock.clone()),
            documents,
            storage,
            notifier,
            clock,
            locks: DocumentLocks::new(),
            settings,
        }
    }

    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    fn validator(&self) -> PdfValidator {
        PdfValidator::new(self.settings.max_document_size_bytes)
    }

    fn sign_link(&self, token: &str) -> String {
        format!(
            "{}/{}/{}",
            self.settings.client_url.trim_end_matches('/'),
            EXTERNAL_SIGN_PATH,
            token
        )
    }

    async fn load(&self, id: Uuid) -> Result<Document, AppError> {
        self.documents.get(id).await?.ok_or_else(|| not_found(id))
    }

    async fn load_owned(&self, owner_id: Uuid, id: Uuid) -> Result<Document, AppError> {
        let document = self.load(id).await?;
        document.ensure_owner(owner_id)?;
        Ok(document)
    }

    /// Parse on a blocking thread; lopdf is CPU-bound.
    async fn inspect_pdf(&self, bytes: Vec<u8>) -> Result<(PdfInfo, Vec<u8>), AppError> {
        tokio::task::spawn_blocking(move || inspect(&bytes).map(|info| (info, bytes)))
            .await
            .map_err(|e| AppError::Internal(format!("PDF inspection task failed: {}", e)))?
            .map_err(AppError::from)
    }

    async fn remove_blob(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete stored file");
        }
    }

    /// Callers release the document lock first; a slow mail server must not stall other writers.
    async fn dispatch(&self, notification: Notification) {
        let timeout = self.settings.notification_timeout;
        match tokio::time::timeout(timeout, self.notifier.send(&notification)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(to = %notification.recipient(), error = %e, "Notification failed");
            }
            Err(_) => {
                tracing::warn!(
                    to = %notification.recipient(),
                    timeout_secs = timeout.as_secs(),
                    "Notification timed out"
                );
            }
        }
    }

    /// Validate, store and register a new PDF.
    #[tracing::instrument(skip(self, bytes, origin), fields(size_bytes = bytes.len()))]
    pub async fn upload(
        &self,
        owner_id: Uuid,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
        origin: Option<String>,
    ) -> Result<Document, AppError> {
        let start = Instant::now();
        let file_name = sanitize_file_name(file_name)?;
        self.validator()
            .validate_all(&file_name, content_type, &bytes)?;
        let (info, bytes) = self.inspect_pdf(bytes).await?;
        let size_bytes = bytes.len();

        let id = Uuid::new_v4();
        let key = original_key(owner_id, id);
        self.storage
            .upload_with_key(&key, bytes, PDF_CONTENT_TYPE)
            .await?;

        let document = Document::new_upload(id, owner_id, file_name, key, self.clock.now());
        let document = match self.documents.insert(&document).await {
            Ok(d) => d,
            Err(e) => {
                self.remove_blob(&document.original_file_key).await;
                return Err(e);
            }
        };

        self.audit
            .append(
                NewAuditEntry::new(id, AuditAction::Upload, Actor::User(owner_id))
                    .origin(origin)
                    .details(json!({
                        "fileName": document.file_name,
                        "sizeBytes": size_bytes,
                        "pageCount": info.page_count,
                    })),
            )
            .await?;

        tracing::info!(
            document_id = %id,
            owner_id = %owner_id,
            page_count = info.page_count,
            duration_ms = start.elapsed().as_millis(),
            "Document uploaded"
        );
        Ok(document)
    }

    pub async fn list(
        &self,
        owner_id: Uuid,
        status: Option<DocumentStatus>,
    ) -> Result<Vec<Document>, AppError> {
        self.documents.list_for_owner(owner_id, status).await
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Document, AppError> {
        self.load_owned(owner_id, id).await
    }

    pub async fn download(
        &self,
        owner_id: Uuid,
        id: Uuid,
        variant: FileVariant,
    ) -> Result<DocumentFile, AppError> {
        let document = self.load_owned(owner_id, id).await?;
        self.read_variant(&document, variant).await
    }

    async fn read_variant(
        &self,
        document: &Document,
        variant: FileVariant,
    ) -> Result<DocumentFile, AppError> {
        let key = document.file_key(variant).ok_or_else(|| {
            AppError::NotFound(format!("Document {} has no signed file", document.id))
        })?;
        let bytes = self.storage.download(key).await?;
        Ok(DocumentFile {
            file_name: variant_file_name(document, variant),
            content_type: PDF_CONTENT_TYPE,
            bytes,
        })
    }

    /// Issue a new share link for `recipient`, replacing any previous one.
    ///
    /// A signed document goes back to pending and its signed file is discarded.
    #[tracing::instrument(skip(self, origin))]
    pub async fn share(
        &self,
        owner_id: Uuid,
        id: Uuid,
        recipient: &str,
        origin: Option<String>,
    ) -> Result<SharedDocument, AppError> {
        let recipient = recipient.trim();
        if !recipient.validate_email() {
            return Err(AppError::InvalidInput(format!(
                "{} is not a valid email address",
                recipient
            )));
        }

        let guard = self.locks.acquire(id).await;
        let mut document = self.load_owned(owner_id, id).await?;
        let token = self.tokens.issue().await?;
        let now = self.clock.now();

        let discarded = document.signed_file_key.take();
        document.status = DocumentStatus::Pending;
        document.signature_placement = None;
        document.rejection_reason = None;
        document.share_token = Some(token.clone());
        document.token_issued_at = Some(now);
        document.shared_with = Some(recipient.to_string());
        document.updated_at = now;

        let document = self.documents.update(&document).await?;
        let expires_at = document.token_expires_at().unwrap_or(now);

        self.audit
            .append(
                NewAuditEntry::new(id, AuditAction::Shared, Actor::User(owner_id))
                    .origin(origin)
                    .details(json!({
                        "sharedWith": recipient,
                        "expiresAt": expires_at,
                    })),
            )
            .await?;

        if let Some(key) = discarded {
            self.remove_blob(&key).await;
        }
        drop(guard);

        let sign_link = self.sign_link(&token);
        self.dispatch(Notification::SignRequest {
            to: recipient.to_string(),
            document_name: document.file_name.clone(),
            sign_link: sign_link.clone(),
            expires_at,
        })
        .await;

        tracing::info!(document_id = %id, "Document shared");
        Ok(SharedDocument {
            document,
            sign_link,
            expires_at,
        })
    }

    /// Owner signature. Allowed in any status and replaces a previous signed file.
    #[tracing::instrument(skip(self, payload, origin), fields(mode = payload.mode()))]
    pub async fn sign(
        &self,
        owner_id: Uuid,
        id: Uuid,
        payload: SignaturePayload,
        origin: Option<String>,
    ) -> Result<Document, AppError> {
        let _guard = self.locks.acquire(id).await;
        let document = self.load_owned(owner_id, id).await?;
        self.commit_signature(document, payload, Actor::User(owner_id), origin, false)
            .await
    }

    /// Signature by the share link holder. At most once per token.
    #[tracing::instrument(skip_all, fields(mode = payload.mode()))]
    pub async fn sign_by_token(
        &self,
        token: &str,
        payload: SignaturePayload,
        origin: Option<String>,
    ) -> Result<Document, AppError> {
        let id = self.tokens.resolve(token).await?.id;
        let guard = self.locks.acquire(id).await;
        let document = self.resolve_pending(token, id).await?;

        let actor = Actor::for_recipient(document.shared_with.as_deref());
        let recipient = document.shared_with.clone();
        let signed = self
            .commit_signature(document, payload, actor, origin, true)
            .await?;
        drop(guard);

        if let Some(to) = recipient {
            self.dispatch(Notification::SignedCopy {
                to,
                document_name: signed.file_name.clone(),
                download_link: self.sign_link(token),
            })
            .await;
        }
        Ok(signed)
    }

    /// Decline by the share link holder. At most once per token.
    #[tracing::instrument(skip_all)]
    pub async fn reject_by_token(
        &self,
        token: &str,
        reason: Option<String>,
        origin: Option<String>,
    ) -> Result<Document, AppError> {
        let id = self.tokens.resolve(token).await?.id;
        let _guard = self.locks.acquire(id).await;
        let mut document = self.resolve_pending(token, id).await?;

        let reason = reason.map(|r| r.trim().to_string()).unwrap_or_default();
        let actor = Actor::for_recipient(document.shared_with.as_deref());

        document.status = DocumentStatus::Rejected;
        document.external_signer_status = DocumentStatus::Rejected;
        document.rejection_reason = Some(reason.clone());
        document.updated_at = self.clock.now();
        let document = self.documents.update(&document).await?;

        self.audit
            .append(
                NewAuditEntry::new(id, AuditAction::Reject, actor)
                    .origin(origin)
                    .details(json!({ "reason": reason })),
            )
            .await?;

        tracing::info!(document_id = %id, "Document rejected by recipient");
        Ok(document)
    }

    /// Re-resolve under the lock; the token may have been rotated or decided meanwhile.
    async fn resolve_pending(&self, token: &str, id: Uuid) -> Result<Document, AppError> {
        let document = self.tokens.resolve(token).await?;
        if document.id != id {
            return Err(AppError::NotFound("Share link not found".to_string()));
        }
        if document.status != DocumentStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Document has already been {}",
                document.status.as_str()
            )));
        }
        Ok(document)
    }

    /// Produce signed bytes and their placement in page space.
    async fn render(
        &self,
        document: &Document,
        payload: SignaturePayload,
    ) -> Result<(Vec<u8>, SignaturePlacement), AppError> {
        match payload {
            SignaturePayload::Rendered { pdf, placement } => {
                self.validator().validate_all("signed.pdf", None, &pdf)?;
                let (info, pdf) = self.inspect_pdf(pdf).await?;
                let rect = map_to_page_space(&placement, &info.first_page)?;
                Ok((
                    pdf,
                    SignaturePlacement::on_page(
                        inkseal_core::constants::SIGNATURE_TARGET_PAGE,
                        rect,
                    ),
                ))
            }
            SignaturePayload::Stamp {
                signature_png,
                placement,
            } => {
                let original = self
                    .storage
                    .download(&document.original_file_key)
                    .await?;
                let signed = tokio::task::spawn_blocking(move || {
                    embed_signature(&original, &signature_png, &placement)
                })
                .await
                .map_err(|e| AppError::Internal(format!("Signature embedding task failed: {}", e)))??;
                Ok((signed.bytes, signed.placement))
            }
        }
    }

    async fn commit_signature(
        &self,
        mut document: Document,
        payload: SignaturePayload,
        actor: Actor,
        origin: Option<String>,
        via_token: bool,
    ) -> Result<Document, AppError> {
        let start = Instant::now();
        let id = document.id;
        let mode = payload.mode();
        let (bytes, placement) = self.render(&document, payload).await?;
        let size_bytes = bytes.len();

        let key = signed_key(document.owner_id, id, Uuid::new_v4());
        self.storage
            .upload_with_key(&key, bytes, PDF_CONTENT_TYPE)
            .await?;

        let previous = document.signed_file_key.replace(key.clone());
        document.status = DocumentStatus::Signed;
        document.signature_placement = Some(placement);
        document.rejection_reason = None;
        if via_token {
            document.external_signer_status = DocumentStatus::Signed;
        }
        document.updated_at = self.clock.now();

        let document = match self.documents.update(&document).await {
            Ok(d) => d,
            Err(e) => {
                self.remove_blob(&key).await;
                return Err(e);
            }
        };

        self.audit
            .append(
                NewAuditEntry::new(id, AuditAction::Sign, &actor)
                    .origin(origin)
                    .details(json!({
                        "fileName": document.file_name,
                        "mode": mode,
                        "external": via_token,
                        "placement": placement,
                    })),
            )
            .await?;

        if let Some(previous) = previous.filter(|p| p != &key) {
            self.remove_blob(&previous).await;
        }

        tracing::info!(
            document_id = %id,
            actor = %actor,
            size_bytes,
            duration_ms = start.elapsed().as_millis(),
            "Document signed"
        );
        Ok(document)
    }

    /// Remove a document and both files. The audit trail is kept.
    #[tracing::instrument(skip(self, origin))]
    pub async fn delete(
        &self,
        owner_id: Uuid,
        id: Uuid,
        origin: Option<String>,
    ) -> Result<(), AppError> {
        let _guard = self.locks.acquire(id).await;
        let document = self.load_owned(owner_id, id).await?;

        self.audit
            .append(
                NewAuditEntry::new(id, AuditAction::Delete, Actor::User(owner_id))
                    .origin(origin.clone())
                    .details(json!({ "fileName": document.file_name })),
            )
            .await?;
        if let Err(e) = self.documents.delete(id, document.version).await {
            // The trail already holds the delete entry; record that it did not take effect.
            let aborted = NewAuditEntry::new(id, AuditAction::Delete, Actor::User(owner_id))
                .origin(origin)
                .details(json!({
                    "fileName": document.file_name,
                    "aborted": true,
                    "error": e.to_string(),
                }));
            if let Err(audit_err) = self.audit.append(aborted).await {
                tracing::warn!(
                    document_id = %id,
                    error = %audit_err,
                    "Failed to record aborted delete"
                );
            }
            return Err(e);
        }

        self.remove_blob(&document.original_file_key).await;
        if let Some(key) = &document.signed_file_key {
            self.remove_blob(key).await;
        }

        tracing::info!(document_id = %id, "Document deleted");
        Ok(())
    }

    /// Audit history for the owner, including documents that have since been deleted.
    pub async fn audit_for(
        &self,
        owner_id: Uuid,
        id: Uuid,
        query: AuditQuery,
    ) -> Result<Vec<AuditEntry>, AppError> {
        match self.documents.get(id).await? {
            Some(document) => document.ensure_owner(owner_id)?,
            None => {
                // A deleted document's newest entry is the owner's delete.
                let newest = self
                    .audit
                    .list_for(
                        id,
                        AuditQuery {
                            limit: Some(1),
                            offset: None,
                        },
                    )
                    .await?;
                let deleted_by_owner = newest.first().is_some_and(|e| {
                    e.action == AuditAction::Delete && e.actor == owner_id.to_string()
                });
                if !deleted_by_owner {
                    return Err(not_found(id));
                }
            }
        }
        self.audit.list_for(id, query).await
    }

    pub async fn view_by_token(&self, token: &str) -> Result<ExternalDocumentView, AppError> {
        let document = self.tokens.resolve(token).await?;
        Ok(ExternalDocumentView::from(&document))
    }

    /// Token holders may fetch the original to render it, and the signed copy once it exists.
    pub async fn download_by_token(
        &self,
        token: &str,
        variant: FileVariant,
    ) -> Result<DocumentFile, AppError> {
        let document = self.tokens.resolve(token).await?;
        self.read_variant(&document, variant).await
    }
}
