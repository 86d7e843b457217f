//! Audit trail models
//!
//! Entries are append-only and outlive the document they describe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::constants::{AUDIT_DEFAULT_LIMIT, AUDIT_MAX_LIMIT};

/// Audited lifecycle action (matches database enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "audit_action", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Upload,
    Sign,
    Shared,
    Reject,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    pub action: AuditAction,
    /// Owner id, recipient email, or `external`
    pub actor: String,
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

/// Entry to append; id and timestamp are assigned by the trail.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub document_id: Uuid,
    pub action: AuditAction,
    pub actor: String,
    pub origin: Option<String>,
    pub details: serde_json::Value,
}

impl NewAuditEntry {
    pub fn new(document_id: Uuid, action: AuditAction, actor: impl ToString) -> Self {
        Self {
            document_id,
            action,
            actor: actor.to_string(),
            origin: None,
            details: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Pagination for audit reads.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(AUDIT_DEFAULT_LIMIT)
            .clamp(1, AUDIT_MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_query_bounds() {
        let q = AuditQuery::default();
        assert_eq!(q.limit(), 50);
        assert_eq!(q.offset(), 0);

        let q = AuditQuery {
            limit: Some(10_000),
            offset: Some(-3),
        };
        assert_eq!(q.limit(), 500);
        assert_eq!(q.offset(), 0);

        let q = AuditQuery {
            limit: Some(0),
            offset: None,
        };
        assert_eq!(q.limit(), 1);
    }

    #[test]
    fn test_new_entry_builder() {
        let id = Uuid::new_v4();
        let entry = NewAuditEntry::new(id, AuditAction::Shared, "owner")
            .origin(Some("10.0.0.1".to_string()))
            .details(serde_json::json!({ "sharedWith": "bob@example.com" }));
        assert_eq!(entry.document_id, id);
        assert_eq!(entry.actor, "owner");
        assert_eq!(entry.details["sharedWith"], "bob@example.com");
    }

    #[test]
    fn test_action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AuditAction::Shared).unwrap(),
            "\"shared\""
        );
    }
}
