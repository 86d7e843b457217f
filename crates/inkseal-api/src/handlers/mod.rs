pub mod audit;
pub mod documents;
pub mod external;
mod form;
pub mod health;

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
};
use inkseal_core::AppError;
use inkseal_services::DocumentFile;

use crate::error::HttpAppError;

/// Serve stored PDF bytes as an attachment.
fn file_response(file: DocumentFile) -> Result<Response<Body>, HttpAppError> {
    let content_disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe_file_name(&file.file_name)
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CACHE_CONTROL, "private, no-store")
        .body(Body::from(file.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Header values must be visible ASCII; quotes and backslashes would break the quoted string.
fn header_safe_file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.trim().is_empty() {
        "document.pdf".to_string()
    } else {
        safe
    }
}
