use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use inkseal_core::models::{AuditEntry, AuditQuery};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/audit",
    tag = "audit",
    params(
        ("id" = Uuid, Path, description = "Document ID"),
        ("limit" = Option<i64>, Query, description = "Page size (default 50, max 500)"),
        ("offset" = Option<i64>, Query, description = "Entries to skip")
    ),
    responses(
        (status = 200, description = "Audit entries, newest first", body = Vec<AuditEntry>),
        (status = 401, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
pub async fn list_audit(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    Path(id): Path<Uuid>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Json<Vec<AuditEntry>>, HttpAppError> {
    let Query(query) = query?;
    let entries = state.lifecycle.audit_for(owner, id, query).await?;
    Ok(Json(entries))
}
