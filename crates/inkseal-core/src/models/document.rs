use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::placement::SignaturePlacement;
use crate::constants::{API_PREFIX, SHARE_TOKEN_VALIDITY_DAYS};
use crate::error::AppError;

/// Owner-facing and delegate-facing status (matches database enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Signed,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Signed => "signed",
            DocumentStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DocumentStatus::Pending),
            "signed" => Ok(DocumentStatus::Signed),
            "rejected" => Ok(DocumentStatus::Rejected),
            other => Err(AppError::InvalidInput(format!(
                "Unknown document status: {}",
                other
            ))),
        }
    }
}

/// Which stored file a download refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileVariant {
    #[default]
    Original,
    Signed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub original_file_key: String,
    pub signed_file_key: Option<String>,
    pub status: DocumentStatus,
    pub external_signer_status: DocumentStatus,
    pub rejection_reason: Option<String>,
    pub share_token: Option<String>,
    pub token_issued_at: Option<DateTime<Utc>>,
    pub shared_with: Option<String>,
    pub signature_placement: Option<SignaturePlacement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every committed transition.
    pub version: i64,
}

impl Document {
    /// Fresh upload: pending, unsigned, never shared.
    pub fn new_upload(
        id: Uuid,
        owner_id: Uuid,
        file_name: String,
        original_file_key: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            file_name,
            original_file_key,
            signed_file_key: None,
            status: DocumentStatus::Pending,
            external_signer_status: DocumentStatus::Pending,
            rejection_reason: None,
            share_token: None,
            token_issued_at: None,
            shared_with: None,
            signature_placement: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn ensure_owner(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "Only the document owner may perform this action".to_string(),
            ))
        }
    }

    /// Moment the current share link stops resolving.
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.token_issued_at
            .map(|issued| issued + Duration::days(SHARE_TOKEN_VALIDITY_DAYS))
    }

    /// `Signed` iff a signed file is referenced.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            DocumentStatus::Signed => self
                .signed_file_key
                .as_deref()
                .is_some_and(|k| !k.is_empty()),
            _ => self.signed_file_key.is_none(),
        }
    }

    pub fn file_key(&self, variant: FileVariant) -> Option<&str> {
        match variant {
            FileVariant::Original => Some(self.original_file_key.as_str()),
            FileVariant::Signed => self.signed_file_key.as_deref(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    pub file_name: String,
    pub status: DocumentStatus,
    pub external_signer_status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_placement: Option<SignaturePlacement>,
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        let download = format!("{}/documents/{}/download", API_PREFIX, doc.id);
        let token_expires_at = doc.token_expires_at();
        DocumentResponse {
            id: doc.id,
            file_name: doc.file_name,
            status: doc.status,
            external_signer_status: doc.external_signer_status,
            rejection_reason: doc.rejection_reason,
            shared_with: doc.shared_with,
            token_expires_at,
            signature_placement: doc.signature_placement,
            original_url: format!("{}?variant=original", download),
            signed_url: doc
                .signed_file_key
                .as_ref()
                .map(|_| format!("{}?variant=signed", download)),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// What a token holder is allowed to see.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDocumentView {
    pub file_name: String,
    pub status: DocumentStatus,
    pub external_signer_status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Document> for ExternalDocumentView {
    fn from(doc: &Document) -> Self {
        ExternalDocumentView {
            file_name: doc.file_name.clone(),
            status: doc.status,
            external_signer_status: doc.external_signer_status,
            rejection_reason: doc.rejection_reason.clone(),
            expires_at: doc.token_expires_at(),
        }
    }
}

/// Result of sharing: the updated document plus the link sent to the recipient.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub document: DocumentResponse,
    pub sign_link: String,
    pub expires_at: DateTime<Utc>,
}
