//! Inkseal Services Layer
//!
//! The signing lifecycle engine and the services it coordinates: share tokens, the audit
//! trail and recipient notifications. The API crate depends on this facade and stays a thin
//! HTTP adapter.

pub mod audit_trail;
pub mod lifecycle;
pub mod locks;
pub mod notification;
pub mod share_token;

pub use audit_trail::AuditTrail;
pub use lifecycle::{
    DocumentFile, DocumentLifecycle, LifecycleSettings, SharedDocument, SignaturePayload,
};
pub use notification::{
    create_notifier, EmailNotifier, LogNotifier, Notification, Notifier, NotifyError,
    RecordingNotifier,
};
pub use share_token::ShareTokens;

pub use inkseal_storage::{create_storage, LocalStorage, Storage, StorageError, StorageResult};
