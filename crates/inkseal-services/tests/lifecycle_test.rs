//! End-to-end lifecycle behaviour over in-memory repositories and local file storage.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use inkseal_core::models::{
    AuditAction, AuditQuery, Document, DocumentStatus, FileVariant, ScreenPlacement,
};
use inkseal_core::{AppError, Clock, ManualClock};
use inkseal_db::{
    AuditRepository, DocumentRepository, InMemoryAuditRepository, InMemoryDocumentRepository,
};
use inkseal_processing::testing;
use inkseal_services::{
    DocumentLifecycle, LifecycleSettings, LocalStorage, Notification, Notifier, NotifyError,
    RecordingNotifier, SignaturePayload, Storage, StorageError, StorageResult,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;
use uuid::Uuid;

struct Harness {
    lifecycle: DocumentLifecycle,
    documents: Arc<InMemoryDocumentRepository>,
    audit: Arc<InMemoryAuditRepository>,
    storage: Arc<LocalStorage>,
    notifier: RecordingNotifier,
    clock: ManualClock,
    _dir: TempDir,
}

async fn local_storage(dir: &Path) -> LocalStorage {
    LocalStorage::new(dir).await.unwrap()
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(local_storage(dir.path()).await);
    build(dir, storage.clone(), storage, None).await
}

async fn build(
    dir: TempDir,
    local: Arc<LocalStorage>,
    storage: Arc<dyn Storage>,
    documents_override: Option<Arc<dyn DocumentRepository>>,
) -> Harness {
    let documents = Arc::new(InMemoryDocumentRepository::new());
    let audit = Arc::new(InMemoryAuditRepository::new());
    let notifier = RecordingNotifier::new();
    let clock = ManualClock::new(Utc::now());
    let repo: Arc<dyn DocumentRepository> = match documents_override {
        Some(repo) => repo,
        None => documents.clone(),
    };

    let lifecycle = DocumentLifecycle::new(
        repo,
        audit.clone(),
        storage,
        Arc::new(notifier.clone()),
        Arc::new(clock.clone()),
        LifecycleSettings::default(),
    );
    Harness {
        lifecycle,
        documents,
        audit,
        storage: local,
        notifier,
        clock,
        _dir: dir,
    }
}

fn placement() -> ScreenPlacement {
    ScreenPlacement {
        rendered_width: 600.0,
        rendered_height: 800.0,
        x: 100.0,
        y: 100.0,
        width: 200.0,
        height: 100.0,
    }
}

fn stamp() -> SignaturePayload {
    SignaturePayload::Stamp {
        signature_png: testing::signature_png(),
        placement: placement(),
    }
}

fn rendered(pdf: Vec<u8>) -> SignaturePayload {
    SignaturePayload::Rendered {
        pdf,
        placement: placement(),
    }
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}

impl Harness {
    async fn upload(&self, owner: Uuid) -> Document {
        self.lifecycle
            .upload(
                owner,
                "contract.pdf",
                Some("application/pdf"),
                testing::pdf_with_pages(2, 612.0, 792.0),
                Some("203.0.113.7".to_string()),
            )
            .await
            .unwrap()
    }

    async fn share(&self, doc: &Document) -> String {
        let shared = self
            .lifecycle
            .share(doc.owner_id, doc.id, "bob@example.com", None)
            .await
            .unwrap();
        shared
            .document
            .share_token
            .expect("shared document carries a token")
    }

    async fn actions(&self, id: Uuid) -> Vec<AuditAction> {
        let mut entries = self
            .lifecycle
            .audit_trail()
            .list_for(id, AuditQuery::default())
            .await
            .unwrap();
        entries.reverse();
        entries.into_iter().map(|e| e.action).collect()
    }

    /// `Signed` iff a non-empty signed file is stored.
    async fn assert_consistent(&self, id: Uuid) {
        let doc = self.documents.get(id).await.unwrap().unwrap();
        assert!(doc.is_consistent());
        assert_eq!(
            doc.signature_placement.is_some(),
            doc.status == DocumentStatus::Signed
        );
        if let Some(key) = &doc.signed_file_key {
            assert!(!self.storage.download(key).await.unwrap().is_empty());
        }
    }
}

#[tokio::test]
async fn test_upload_creates_pending_document_with_audit_entry() {
    let h = harness().await;
    let owner = Uuid::new_v4();
    let doc = h.upload(owner).await;

    assert_eq!(doc.status, DocumentStatus::Pending);
    assert_eq!(doc.external_signer_status, DocumentStatus::Pending);
    assert!(doc.share_token.is_none());
    assert_eq!(
        doc.original_file_key,
        format!("documents/{}/{}/original.pdf", owner, doc.id)
    );
    assert!(h.storage.exists(&doc.original_file_key).await.unwrap());

    let entries = h.audit.all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::Upload);
    assert_eq!(entries[0].actor, owner.to_string());
    assert_eq!(entries[0].origin.as_deref(), Some("203.0.113.7"));
    assert_eq!(entries[0].details["pageCount"], 2);
}

#[tokio::test]
async fn test_upload_rejects_invalid_payloads() {
    let h = harness().await;
    let owner = Uuid::new_v4();

    let err = h
        .lifecycle
        .upload(owner, "a.pdf", None, b"%PDF-1.7 garbage".to_vec(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDocument(_)));

    let err = h
        .lifecycle
        .upload(owner, "a.pdf", None, testing::pdf_without_pages(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyDocument(_)));

    let err = h
        .lifecycle
        .upload(owner, "a.docx", None, testing::pdf_with_pages(1, 612.0, 792.0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let mut oversized = testing::pdf_with_pages(1, 612.0, 792.0);
    oversized.resize(LifecycleSettings::default().max_document_size_bytes + 1, b' ');
    let err = h
        .lifecycle
        .upload(owner, "a.pdf", None, oversized, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge(_)));

    assert!(h.documents.is_empty());
    assert!(h.audit.all().is_empty());
}

#[tokio::test]
async fn test_owner_stamp_maps_placement_and_keeps_original() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let original = h.storage.download(&doc.original_file_key).await.unwrap();

    let signed = h
        .lifecycle
        .sign(doc.owner_id, doc.id, stamp(), None)
        .await
        .unwrap();

    assert_eq!(signed.status, DocumentStatus::Signed);
    assert_eq!(signed.external_signer_status, DocumentStatus::Pending);
    let p = signed.signature_placement.unwrap();
    assert_eq!((p.page, p.x, p.y, p.width, p.height), (1, 102.0, 594.0, 204.0, 99.0));

    let file = h
        .lifecycle
        .download(doc.owner_id, doc.id, FileVariant::Signed)
        .await
        .unwrap();
    assert_ne!(file.bytes, original);
    assert_eq!(file.file_name, "signed-contract.pdf");
    assert_eq!(
        h.storage.download(&doc.original_file_key).await.unwrap(),
        original
    );
    h.assert_consistent(doc.id).await;
}

#[tokio::test]
async fn test_owner_only_operations() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let stranger = Uuid::new_v4();

    assert!(matches!(
        h.lifecycle.get(stranger, doc.id).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        h.lifecycle.sign(stranger, doc.id, stamp(), None).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        h.lifecycle
            .share(stranger, doc.id, "bob@example.com", None)
            .await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        h.lifecycle.delete(stranger, doc.id, None).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        h.lifecycle.get(doc.owner_id, Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        h.lifecycle
            .download(doc.owner_id, doc.id, FileVariant::Signed)
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let h = harness().await;
    let owner = Uuid::new_v4();
    let first = h.upload(owner).await;
    h.clock.advance(Duration::seconds(1));
    let second = h.upload(owner).await;
    h.upload(Uuid::new_v4()).await;

    h.lifecycle.sign(owner, first.id, stamp(), None).await.unwrap();

    let all = h.lifecycle.list(owner, None).await.unwrap();
    assert_eq!(
        all.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
    let signed = h
        .lifecycle
        .list(owner, Some(DocumentStatus::Signed))
        .await
        .unwrap();
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].id, first.id);
}

#[tokio::test]
async fn test_share_validates_recipient_and_sends_link() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;

    assert!(matches!(
        h.lifecycle
            .share(doc.owner_id, doc.id, "not-an-email", None)
            .await,
        Err(AppError::InvalidInput(_))
    ));

    let shared = h
        .lifecycle
        .share(doc.owner_id, doc.id, "bob@example.com", None)
        .await
        .unwrap();
    let token = shared.document.share_token.clone().unwrap();
    assert_eq!(token.len(), 64);
    assert_eq!(shared.document.token_issued_at, Some(h.clock.now()));
    assert_eq!(shared.expires_at, h.clock.now() + Duration::days(7));
    assert_eq!(
        shared.sign_link,
        format!("http://localhost:5173/external-sign/{}", token)
    );

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Notification::SignRequest { to, sign_link, .. } => {
            assert_eq!(to, "bob@example.com");
            assert_eq!(sign_link, &shared.sign_link);
        }
        other => panic!("unexpected notification {:?}", other),
    }
    assert_eq!(
        h.actions(doc.id).await,
        vec![AuditAction::Upload, AuditAction::Shared]
    );
}

#[tokio::test]
async fn test_token_resolves_until_exactly_seven_days() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let token = h.share(&doc).await;

    h.clock.advance(Duration::days(7));
    let view = h.lifecycle.view_by_token(&token).await.unwrap();
    assert_eq!(view.file_name, "contract.pdf");
    assert_eq!(view.status, DocumentStatus::Pending);

    h.clock.advance(Duration::microseconds(1));
    assert!(matches!(
        h.lifecycle.view_by_token(&token).await,
        Err(AppError::Expired(_))
    ));
    assert!(matches!(
        h.lifecycle.sign_by_token(&token, stamp(), None).await,
        Err(AppError::Expired(_))
    ));
    assert!(matches!(
        h.lifecycle.view_by_token(&"0".repeat(64)).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_token_holder_can_download_original() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let token = h.share(&doc).await;

    let file = h
        .lifecycle
        .download_by_token(&token, FileVariant::Original)
        .await
        .unwrap();
    assert_eq!(
        file.bytes,
        h.storage.download(&doc.original_file_key).await.unwrap()
    );
    assert!(matches!(
        h.lifecycle
            .download_by_token(&token, FileVariant::Signed)
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_second_token_decision_conflicts() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let token = h.share(&doc).await;

    let rejected = h
        .lifecycle
        .reject_by_token(&token, Some("Wrong counterparty".to_string()), None)
        .await
        .unwrap();
    assert_eq!(rejected.status, DocumentStatus::Rejected);
    assert_eq!(rejected.external_signer_status, DocumentStatus::Rejected);

    assert!(matches!(
        h.lifecycle.sign_by_token(&token, stamp(), None).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        h.lifecycle
            .reject_by_token(&token, Some("again".to_string()), None)
            .await,
        Err(AppError::Conflict(_))
    ));

    let current = h.documents.get(doc.id).await.unwrap().unwrap();
    assert_eq!(current.status, rejected.status);
    assert_eq!(current.external_signer_status, rejected.external_signer_status);
    assert_eq!(current.rejection_reason.as_deref(), Some("Wrong counterparty"));
    assert_eq!(current.version, rejected.version);

    let reject_rows = h.audit.all().iter().filter(|e| e.action == AuditAction::Reject).count();
    assert_eq!(reject_rows, 1);
    assert_eq!(
        h.audit
            .all()
            .iter()
            .find(|e| e.action == AuditAction::Reject)
            .unwrap()
            .actor,
        "bob@example.com"
    );
    h.assert_consistent(doc.id).await;
}

#[tokio::test]
async fn test_reject_with_empty_reason() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let token = h.share(&doc).await;

    let rejected = h
        .lifecycle
        .reject_by_token(&token, None, None)
        .await
        .unwrap();
    assert_eq!(rejected.rejection_reason.as_deref(), Some(""));
}

#[tokio::test]
async fn test_concurrent_token_signatures_have_one_winner() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let token = h.share(&doc).await;

    let (a, b) = tokio::join!(
        h.lifecycle.sign_by_token(&token, stamp(), None),
        h.lifecycle.sign_by_token(&token, stamp(), None)
    );
    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(AppError::Conflict(_))));

    let signed_files = files_under(h.storage.base_path())
        .into_iter()
        .filter(|p| p.to_string_lossy().contains("signed-"))
        .count();
    assert_eq!(signed_files, 1);
    h.assert_consistent(doc.id).await;
}

#[tokio::test]
async fn test_reshare_after_reject_invalidates_old_token() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let old = h.share(&doc).await;
    h.lifecycle
        .reject_by_token(&old, Some("no".to_string()), None)
        .await
        .unwrap();

    let new = h.share(&doc).await;
    assert_ne!(old, new);
    assert!(matches!(
        h.lifecycle.view_by_token(&old).await,
        Err(AppError::NotFound(_))
    ));

    let current = h.documents.get(doc.id).await.unwrap().unwrap();
    assert_eq!(current.status, DocumentStatus::Pending);
    assert_eq!(current.external_signer_status, DocumentStatus::Rejected);
    assert!(current.rejection_reason.is_none());

    let signed = h.lifecycle.sign_by_token(&new, stamp(), None).await.unwrap();
    assert_eq!(signed.external_signer_status, DocumentStatus::Signed);
}

#[tokio::test]
async fn test_share_after_sign_discards_signed_file() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let signed = h
        .lifecycle
        .sign(doc.owner_id, doc.id, stamp(), None)
        .await
        .unwrap();
    let signed_key = signed.signed_file_key.unwrap();

    h.share(&doc).await;

    let current = h.documents.get(doc.id).await.unwrap().unwrap();
    assert_eq!(current.status, DocumentStatus::Pending);
    assert!(current.signed_file_key.is_none());
    assert!(!h.storage.exists(&signed_key).await.unwrap());
    h.assert_consistent(doc.id).await;
}

#[tokio::test]
async fn test_full_flow_with_external_and_owner_signatures() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let token = h.share(&doc).await;

    h.clock.advance(Duration::minutes(5));
    let external = h.lifecycle.sign_by_token(&token, stamp(), None).await.unwrap();
    assert_eq!(external.external_signer_status, DocumentStatus::Signed);
    let external_key = external.signed_file_key.clone().unwrap();

    h.clock.advance(Duration::minutes(5));
    let owner_pdf = testing::pdf_with_pages(3, 612.0, 792.0);
    let resigned = h
        .lifecycle
        .sign(doc.owner_id, doc.id, rendered(owner_pdf.clone()), None)
        .await
        .unwrap();

    assert_eq!(resigned.status, DocumentStatus::Signed);
    assert_eq!(resigned.external_signer_status, DocumentStatus::Signed);
    assert_ne!(resigned.signed_file_key.as_deref(), Some(external_key.as_str()));
    assert!(!h.storage.exists(&external_key).await.unwrap());

    let latest = h
        .lifecycle
        .download(doc.owner_id, doc.id, FileVariant::Signed)
        .await
        .unwrap();
    assert_eq!(latest.bytes, owner_pdf);

    assert_eq!(
        h.actions(doc.id).await,
        vec![
            AuditAction::Upload,
            AuditAction::Shared,
            AuditAction::Sign,
            AuditAction::Sign
        ]
    );
    let entries = h.audit.all();
    assert_eq!(entries[2].actor, "bob@example.com");
    assert_eq!(entries[3].actor, doc.owner_id.to_string());

    let copies: Vec<_> = h
        .notifier
        .sent()
        .into_iter()
        .filter(|n| matches!(n, Notification::SignedCopy { .. }))
        .collect();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].recipient(), "bob@example.com");
    h.assert_consistent(doc.id).await;
}

#[tokio::test]
async fn test_delete_removes_files_and_keeps_history() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;
    let signed = h
        .lifecycle
        .sign(doc.owner_id, doc.id, stamp(), None)
        .await
        .unwrap();
    let signed_key = signed.signed_file_key.unwrap();

    h.lifecycle.delete(doc.owner_id, doc.id, None).await.unwrap();

    assert!(h.documents.get(doc.id).await.unwrap().is_none());
    assert!(!h.storage.exists(&doc.original_file_key).await.unwrap());
    assert!(!h.storage.exists(&signed_key).await.unwrap());
    assert!(files_under(h.storage.base_path()).is_empty());

    let history = h
        .lifecycle
        .audit_for(doc.owner_id, doc.id, AuditQuery::default())
        .await
        .unwrap();
    let actions: Vec<AuditAction> = history.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Delete, AuditAction::Sign, AuditAction::Upload]
    );
    assert!(matches!(
        h.lifecycle
            .audit_for(Uuid::new_v4(), doc.id, AuditQuery::default())
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_invalid_signature_inputs_leave_document_untouched() {
    let h = harness().await;
    let doc = h.upload(Uuid::new_v4()).await;

    let bad_png = SignaturePayload::Stamp {
        signature_png: testing::signature_jpeg(),
        placement: placement(),
    };
    assert!(matches!(
        h.lifecycle.sign(doc.owner_id, doc.id, bad_png, None).await,
        Err(AppError::InvalidSignatureImage(_))
    ));

    let mut zero = placement();
    zero.rendered_width = 0.0;
    let bad_placement = SignaturePayload::Stamp {
        signature_png: testing::signature_png(),
        placement: zero,
    };
    assert!(matches!(
        h.lifecycle
            .sign(doc.owner_id, doc.id, bad_placement, None)
            .await,
        Err(AppError::InvalidInput(_))
    ));

    assert!(matches!(
        h.lifecycle
            .sign(doc.owner_id, doc.id, rendered(b"<html/>".to_vec()), None)
            .await,
        Err(AppError::InvalidDocument(_))
    ));

    let current = h.documents.get(doc.id).await.unwrap().unwrap();
    assert_eq!(current.status, DocumentStatus::Pending);
    assert_eq!(current.version, doc.version);
    assert_eq!(h.actions(doc.id).await, vec![AuditAction::Upload]);
}

/// Refuses to store signed variants.
struct SignedWritesFail(Arc<LocalStorage>);

#[async_trait]
impl Storage for SignedWritesFail {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        if storage_key.contains("/signed-") {
            return Err(StorageError::UploadFailed("disk full".to_string()));
        }
        self.0.upload_with_key(storage_key, data, content_type).await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.0.download(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.0.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.0.exists(storage_key).await
    }
}

#[tokio::test]
async fn test_storage_failure_aborts_signing() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(local_storage(dir.path()).await);
    let h = build(dir, local.clone(), Arc::new(SignedWritesFail(local)), None).await;
    let doc = h.upload(Uuid::new_v4()).await;
    let token = h.share(&doc).await;

    let err = h
        .lifecycle
        .sign_by_token(&token, stamp(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StorageFailure(_)));

    let current = h.documents.get(doc.id).await.unwrap().unwrap();
    assert_eq!(current.status, DocumentStatus::Pending);
    assert_eq!(current.external_signer_status, DocumentStatus::Pending);
    assert_eq!(
        h.actions(doc.id).await,
        vec![AuditAction::Upload, AuditAction::Shared]
    );
}

/// Delegates to an in-memory repository but always loses the version check on update and delete.
struct AlwaysStale(Arc<InMemoryDocumentRepository>);

#[async_trait]
impl DocumentRepository for AlwaysStale {
    async fn insert(&self, document: &Document) -> Result<Document, AppError> {
        self.0.insert(document).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        self.0.get(id).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Document>, AppError> {
        self.0.find_by_token(token).await
    }

    async fn token_exists(&self, token: &str) -> Result<bool, AppError> {
        self.0.token_exists(token).await
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        status: Option<DocumentStatus>,
    ) -> Result<Vec<Document>, AppError> {
        self.0.list_for_owner(owner_id, status).await
    }

    async fn update(&self, _document: &Document) -> Result<Document, AppError> {
        Err(AppError::Conflict(
            "Document was modified concurrently".to_string(),
        ))
    }

    async fn delete(&self, _id: Uuid, _expected_version: i64) -> Result<(), AppError> {
        Err(AppError::Conflict(
            "Document was modified concurrently".to_string(),
        ))
    }
}

#[tokio::test]
async fn test_lost_version_race_removes_fresh_blob() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(local_storage(dir.path()).await);
    let inner = Arc::new(InMemoryDocumentRepository::new());
    let h = build(
        dir,
        local.clone(),
        local,
        Some(Arc::new(AlwaysStale(inner.clone()))),
    )
    .await;
    let doc = h.upload(Uuid::new_v4()).await;

    let err = h
        .lifecycle
        .sign(doc.owner_id, doc.id, stamp(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let files = files_under(h.storage.base_path());
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("original.pdf"));
    assert_eq!(
        inner.get(doc.id).await.unwrap().unwrap().status,
        DocumentStatus::Pending
    );
}

#[tokio::test]
async fn test_lost_delete_race_records_aborted_entry() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(local_storage(dir.path()).await);
    let inner = Arc::new(InMemoryDocumentRepository::new());
    let h = build(
        dir,
        local.clone(),
        local,
        Some(Arc::new(AlwaysStale(inner.clone()))),
    )
    .await;
    let doc = h.upload(Uuid::new_v4()).await;

    let err = h
        .lifecycle
        .delete(doc.owner_id, doc.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert!(inner.get(doc.id).await.unwrap().is_some());
    assert!(h.storage.exists(&doc.original_file_key).await.unwrap());

    let history = h
        .lifecycle
        .audit_for(doc.owner_id, doc.id, AuditQuery::default())
        .await
        .unwrap();
    let actions: Vec<AuditAction> = history.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Delete, AuditAction::Delete, AuditAction::Upload]
    );
    assert_eq!(history[0].details["aborted"], true);
    assert!(history[1].details.get("aborted").is_none());
}

struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("connection refused".to_string()))
    }
}

struct SlowNotifier;

#[async_trait]
impl Notifier for SlowNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_notification_failures_do_not_fail_share() {
    for notifier in [
        Arc::new(BrokenNotifier) as Arc<dyn Notifier>,
        Arc::new(SlowNotifier) as Arc<dyn Notifier>,
    ] {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(local_storage(dir.path()).await);
        let documents = Arc::new(InMemoryDocumentRepository::new());
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::new());
        let lifecycle = DocumentLifecycle::new(
            documents,
            audit,
            storage,
            notifier,
            Arc::new(ManualClock::new(Utc::now())),
            LifecycleSettings {
                notification_timeout: std::time::Duration::from_millis(50),
                ..LifecycleSettings::default()
            },
        );

        let owner = Uuid::new_v4();
        let doc = lifecycle
            .upload(
                owner,
                "contract.pdf",
                None,
                testing::pdf_with_pages(1, 612.0, 792.0),
                None,
            )
            .await
            .unwrap();
        let shared = lifecycle
            .share(owner, doc.id, "bob@example.com", None)
            .await
            .unwrap();
        assert!(shared.document.share_token.is_some());
    }
}

/// Holds every send until released, signalling when a send has started.
#[derive(Clone, Default)]
struct GatedNotifier {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl Notifier for GatedNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_pending_notification_does_not_block_other_writers() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(local_storage(dir.path()).await);
    let documents = Arc::new(InMemoryDocumentRepository::new());
    let notifier = GatedNotifier::default();
    let lifecycle = DocumentLifecycle::new(
        documents.clone(),
        Arc::new(InMemoryAuditRepository::new()),
        storage,
        Arc::new(notifier.clone()),
        Arc::new(ManualClock::new(Utc::now())),
        LifecycleSettings {
            notification_timeout: std::time::Duration::from_secs(30),
            ..LifecycleSettings::default()
        },
    );

    let owner = Uuid::new_v4();
    let doc = lifecycle
        .upload(
            owner,
            "contract.pdf",
            None,
            testing::pdf_with_pages(1, 612.0, 792.0),
            None,
        )
        .await
        .unwrap();

    let id = doc.id;
    let sharing = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            lifecycle
                .share(owner, id, "bob@example.com", None)
                .await
        })
    };
    notifier.entered.notified().await;

    // The share is committed and its email is still in flight.
    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        lifecycle.delete(owner, id, None),
    )
    .await
    .expect("delete waited on the share notification")
    .unwrap();
    assert!(documents.get(id).await.unwrap().is_none());

    notifier.release.notify_one();
    let shared = sharing.await.unwrap().unwrap();
    assert!(shared.document.share_token.is_some());
}
