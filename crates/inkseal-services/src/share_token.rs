//! Share token issuance and resolution.
//!
//! A token is 32 random bytes rendered as 64 lowercase hex characters. Validity is derived at
//! read time from the document's `token_issued_at`; nothing else about expiry is persisted.

use chrono::{DateTime, Duration, Utc};
use inkseal_core::constants::{
    SHARE_TOKEN_BYTES, SHARE_TOKEN_MAX_ATTEMPTS, SHARE_TOKEN_VALIDITY_DAYS,
};
use inkseal_core::models::Document;
use inkseal_core::{AppError, Clock};
use inkseal_db::DocumentRepository;
use rand::RngCore;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Generate a new random token. Uniqueness is checked by [`ShareTokens::issue`].
pub fn generate_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Shape check done before touching the database.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == SHARE_TOKEN_BYTES * 2
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// `now - issued_at <= 7 days`, inclusive at the boundary.
pub fn is_within_window(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - issued_at <= Duration::days(SHARE_TOKEN_VALIDITY_DAYS)
}

#[derive(Clone)]
pub struct ShareTokens {
    documents: Arc<dyn DocumentRepository>,
    clock: Arc<dyn Clock>,
}

impl ShareTokens {
    pub fn new(documents: Arc<dyn DocumentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { documents, clock }
    }

    /// A token not currently bound to any document.
    ///
    /// The unique index on `share_token` still rejects a racing duplicate at commit time.
    pub async fn issue(&self) -> Result<String, AppError> {
        for attempt in 1..=SHARE_TOKEN_MAX_ATTEMPTS {
            let token = generate_token();
            if !self.documents.token_exists(&token).await? {
                return Ok(token);
            }
            tracing::warn!(attempt, "Share token collision, regenerating");
        }
        Err(AppError::Internal(
            "Could not generate a unique share token".to_string(),
        ))
    }

    /// Find the document bound to `token`.
    ///
    /// Unknown or malformed tokens are `NotFound`; a known token past its window is `Expired`.
    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> Result<Document, AppError> {
        if !is_well_formed(token) {
            return Err(AppError::NotFound("Share link not found".to_string()));
        }

        let document = self
            .documents
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Share link not found".to_string()))?;

        let matches: bool = document
            .share_token
            .as_deref()
            .map(|stored| stored.as_bytes().ct_eq(token.as_bytes()).into())
            .unwrap_or(false);
        if !matches {
            return Err(AppError::NotFound("Share link not found".to_string()));
        }

        let issued_at = document
            .token_issued_at
            .ok_or_else(|| AppError::Expired("Share link has no issue time".to_string()))?;
        if !is_within_window(issued_at, self.clock.now()) {
            tracing::debug!(document_id = %document.id, "Share link expired");
            return Err(AppError::Expired(
                "This share link has expired; ask the owner to share again".to_string(),
            ));
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkseal_core::ManualClock;
    use inkseal_db::InMemoryDocumentRepository;
    use uuid::Uuid;

    fn shared_document(token: &str, issued_at: DateTime<Utc>) -> Document {
        let id = Uuid::new_v4();
        let mut doc = Document::new_upload(
            id,
            Uuid::new_v4(),
            "nda.pdf".to_string(),
            format!("documents/x/{}/original.pdf", id),
            issued_at,
        );
        doc.share_token = Some(token.to_string());
        doc.token_issued_at = Some(issued_at);
        doc
    }

    #[test]
    fn test_generated_tokens_are_well_formed_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(is_well_formed(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_well_formed_is_case_sensitive() {
        assert!(is_well_formed(&"ab".repeat(32)));
        assert!(!is_well_formed(&"AB".repeat(32)));
        assert!(!is_well_formed("abc"));
        assert!(!is_well_formed(&"zz".repeat(32)));
    }

    #[test]
    fn test_window_is_inclusive() {
        let issued = Utc::now();
        assert!(is_within_window(issued, issued + Duration::days(7)));
        assert!(!is_within_window(
            issued,
            issued + Duration::days(7) + Duration::microseconds(1)
        ));
    }

    #[tokio::test]
    async fn test_resolve_expiry_boundary() {
        let issued = Utc::now();
        let clock = ManualClock::new(issued);
        let repo = InMemoryDocumentRepository::new();
        let token = generate_token();
        repo.insert(&shared_document(&token, issued)).await.unwrap();

        let tokens = ShareTokens::new(Arc::new(repo), Arc::new(clock.clone()));

        clock.set(issued + Duration::days(7));
        assert!(tokens.resolve(&token).await.is_ok());

        clock.advance(Duration::microseconds(1));
        assert!(matches!(
            tokens.resolve(&token).await,
            Err(AppError::Expired(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_unknown_and_wrong_case() {
        let issued = Utc::now();
        let repo = InMemoryDocumentRepository::new();
        let token = generate_token();
        repo.insert(&shared_document(&token, issued)).await.unwrap();
        let tokens = ShareTokens::new(Arc::new(repo), Arc::new(ManualClock::new(issued)));

        assert!(matches!(
            tokens.resolve(&generate_token()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            tokens.resolve(&token.to_uppercase()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_issue_returns_unused_token() {
        let repo: Arc<dyn DocumentRepository> = Arc::new(InMemoryDocumentRepository::new());
        let tokens = ShareTokens::new(repo.clone(), Arc::new(ManualClock::new(Utc::now())));
        let token = tokens.issue().await.unwrap();
        assert!(is_well_formed(&token));
        assert!(!repo.token_exists(&token).await.unwrap());
    }
}
