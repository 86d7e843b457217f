//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use inkseal_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inkseal API",
        version = "0.1.0",
        description = "PDF signing service. Owners upload documents, sign them, and share one-time signing links; link holders view, sign or reject without an account. Every transition is recorded in an append-only audit trail."
    ),
    paths(
        handlers::documents::upload_document,
        handlers::documents::list_documents,
        handlers::documents::get_document,
        handlers::documents::download_document,
        handlers::documents::sign_document,
        handlers::documents::share_document,
        handlers::documents::delete_document,
        handlers::audit::list_audit,
        handlers::external::view_shared,
        handlers::external::download_shared,
        handlers::external::sign_shared,
        handlers::external::reject_shared,
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        models::DocumentResponse,
        models::DocumentStatus,
        models::FileVariant,
        models::SignaturePlacement,
        models::ScreenPlacement,
        models::ShareResponse,
        models::ExternalDocumentView,
        models::AuditEntry,
        models::AuditAction,
        handlers::documents::ShareRequest,
        handlers::external::RejectRequest,
        handlers::health::HealthCheckResponse,
    )),
    tags(
        (name = "documents", description = "Owner document operations"),
        (name = "external", description = "Share link operations"),
        (name = "audit", description = "Audit trail"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
