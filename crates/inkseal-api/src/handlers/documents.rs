//! Owner-facing document endpoints.

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Multipart, Path, Query, State},
    http::{Response, StatusCode},
    Json,
};
use inkseal_core::models::{DocumentResponse, DocumentStatus, FileVariant, ShareResponse};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{file_response, form};
use crate::auth::AuthUser;
use crate::client_ip::ClientOrigin;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub variant: FileVariant,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShareRequest {
    /// Recipient address; the sign link is mailed here.
    pub email: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/documents",
    tag = "documents",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document uploaded", body = DocumentResponse),
        (status = 400, description = "Not a usable PDF", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, origin, multipart), fields(owner_id = %owner, operation = "upload_document"))]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    ClientOrigin(origin): ClientOrigin,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), HttpAppError> {
    let file = form::read_document(multipart).await?;
    let document = state
        .lifecycle
        .upload(
            owner,
            &file.file_name,
            file.content_type.as_deref(),
            file.bytes,
            origin,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(document.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "documents",
    params(
        ("status" = Option<String>, Query, description = "Filter by status: pending, signed or rejected")
    ),
    responses(
        (status = 200, description = "Documents, newest first", body = Vec<DocumentResponse>),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    )
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<DocumentResponse>>, HttpAppError> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<DocumentStatus>)
        .transpose()?;
    let documents = state.lifecycle.list(owner, status).await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document", body = DocumentResponse),
        (status = 401, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let document = state.lifecycle.get(owner, id).await?;
    Ok(Json(document.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/download",
    tag = "documents",
    params(
        ("id" = Uuid, Path, description = "Document ID"),
        ("variant" = Option<FileVariant>, Query, description = "original (default) or signed")
    ),
    responses(
        (status = 200, description = "PDF file", content_type = "application/pdf"),
        (status = 401, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document or variant not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(owner_id = %owner, document_id = %id))]
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    Path(id): Path<Uuid>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response<Body>, HttpAppError> {
    let Query(query) = query?;
    let file = state.lifecycle.download(owner, id, query.variant).await?;
    file_response(file)
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/sign",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document signed", body = DocumentResponse),
        (status = 400, description = "Invalid signature or PDF", body = ErrorResponse),
        (status = 401, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, origin, multipart), fields(owner_id = %owner, document_id = %id, operation = "sign_document"))]
pub async fn sign_document(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    ClientOrigin(origin): ClientOrigin,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let payload = form::read_signature(multipart).await?;
    let document = state.lifecycle.sign(owner, id, payload, origin).await?;
    Ok(Json(document.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/share",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = ShareRequest,
    responses(
        (status = 200, description = "Share link issued", body = ShareResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 401, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, origin, request), fields(owner_id = %owner, document_id = %id, operation = "share_document"))]
pub async fn share_document(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    ClientOrigin(origin): ClientOrigin,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ShareRequest>,
) -> Result<Json<ShareResponse>, HttpAppError> {
    let shared = state
        .lifecycle
        .share(owner, id, &request.email, origin)
        .await?;
    Ok(Json(ShareResponse {
        document: shared.document.into(),
        sign_link: shared.sign_link,
        expires_at: shared.expires_at,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 401, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, origin), fields(owner_id = %owner, document_id = %id, operation = "delete_document"))]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    AuthUser(owner): AuthUser,
    ClientOrigin(origin): ClientOrigin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.lifecycle.delete(owner, id, origin).await?;
    Ok(StatusCode::NO_CONTENT)
}
