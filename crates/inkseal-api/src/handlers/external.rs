//! Share-link endpoints. The token in the path is the only credential.

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Multipart, Path, Query, State},
    http::Response,
    Json,
};
use inkseal_core::models::{ExternalDocumentView, FileVariant};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::documents::DownloadQuery;
use super::{file_response, form};
use crate::client_ip::ClientOrigin;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectRequest {
    /// Optional explanation shown to the owner.
    #[serde(default)]
    pub reason: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/external/{token}",
    tag = "external",
    params(("token" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "Shared document", body = ExternalDocumentView),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 410, description = "Share link expired", body = ErrorResponse)
    )
)]
pub async fn view_shared(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ExternalDocumentView>, HttpAppError> {
    let view = state.lifecycle.view_by_token(&token).await?;
    Ok(Json(view))
}

#[utoipa::path(
    get,
    path = "/api/v1/external/{token}/download",
    tag = "external",
    params(
        ("token" = String, Path, description = "Share token"),
        ("variant" = Option<FileVariant>, Query, description = "original (default) or signed")
    ),
    responses(
        (status = 200, description = "PDF file", content_type = "application/pdf"),
        (status = 404, description = "Unknown token or missing variant", body = ErrorResponse),
        (status = 410, description = "Share link expired", body = ErrorResponse)
    )
)]
pub async fn download_shared(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response<Body>, HttpAppError> {
    let Query(query) = query?;
    let file = state
        .lifecycle
        .download_by_token(&token, query.variant)
        .await?;
    file_response(file)
}

#[utoipa::path(
    post,
    path = "/api/v1/external/{token}/sign",
    tag = "external",
    params(("token" = String, Path, description = "Share token")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document signed", body = ExternalDocumentView),
        (status = 400, description = "Invalid signature or PDF", body = ErrorResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 409, description = "Already signed or rejected", body = ErrorResponse),
        (status = 410, description = "Share link expired", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "external_sign"))]
pub async fn sign_shared(
    State(state): State<Arc<AppState>>,
    ClientOrigin(origin): ClientOrigin,
    Path(token): Path<String>,
    multipart: Multipart,
) -> Result<Json<ExternalDocumentView>, HttpAppError> {
    let payload = form::read_signature(multipart).await?;
    let document = state
        .lifecycle
        .sign_by_token(&token, payload, origin)
        .await?;
    Ok(Json(ExternalDocumentView::from(&document)))
}

#[utoipa::path(
    post,
    path = "/api/v1/external/{token}/reject",
    tag = "external",
    params(("token" = String, Path, description = "Share token")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Document rejected", body = ExternalDocumentView),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 409, description = "Already signed or rejected", body = ErrorResponse),
        (status = 410, description = "Share link expired", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "external_reject"))]
pub async fn reject_shared(
    State(state): State<Arc<AppState>>,
    ClientOrigin(origin): ClientOrigin,
    Path(token): Path<String>,
    ValidatedJson(request): ValidatedJson<RejectRequest>,
) -> Result<Json<ExternalDocumentView>, HttpAppError> {
    let document = state
        .lifecycle
        .reject_by_token(&token, request.reason, origin)
        .await?;
    Ok(Json(ExternalDocumentView::from(&document)))
}
