//! Multipart form parsing for uploads and signatures.

use axum::extract::Multipart;
use inkseal_core::models::ScreenPlacement;
use inkseal_core::AppError;
use inkseal_services::SignaturePayload;

use crate::error::HttpAppError;

/// The `document` part of an upload form.
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub async fn read_document(mut multipart: Multipart) -> Result<UploadedFile, HttpAppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("document") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidInput("Document part has no file name".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Err(AppError::InvalidInput("No document uploaded".to_string()).into())
}

/// Accepts either `signedPdf` + `signatureMeta` (the client already stamped the page) or
/// `signature` + `placement` (stamp the PNG onto the stored original).
pub async fn read_signature(mut multipart: Multipart) -> Result<SignaturePayload, HttpAppError> {
    let mut signed_pdf = None;
    let mut signature_meta = None;
    let mut signature_png = None;
    let mut placement = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "signedPdf" => signed_pdf = Some(field.bytes().await?.to_vec()),
            "signatureMeta" => signature_meta = Some(parse_placement(&name, &field.text().await?)?),
            "signature" => signature_png = Some(field.bytes().await?.to_vec()),
            "placement" => placement = Some(parse_placement(&name, &field.text().await?)?),
            _ => {}
        }
    }

    match (signed_pdf, signature_png) {
        (Some(_), Some(_)) => Err(AppError::InvalidInput(
            "Send either signedPdf or signature, not both".to_string(),
        )
        .into()),
        (Some(pdf), None) => {
            let placement = signature_meta.ok_or_else(|| {
                AppError::InvalidInput("signatureMeta is required with signedPdf".to_string())
            })?;
            Ok(SignaturePayload::Rendered { pdf, placement })
        }
        (None, Some(signature_png)) => {
            let placement = placement.ok_or_else(|| {
                AppError::InvalidInput("placement is required with signature".to_string())
            })?;
            Ok(SignaturePayload::Stamp {
                signature_png,
                placement,
            })
        }
        (None, None) => Err(AppError::InvalidInput(
            "No signature provided: send signedPdf or signature".to_string(),
        )
        .into()),
    }
}

fn parse_placement(field: &str, text: &str) -> Result<ScreenPlacement, AppError> {
    serde_json::from_str(text)
        .map_err(|e| AppError::InvalidInput(format!("Invalid {} JSON: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placement() {
        let p = parse_placement(
            "placement",
            r#"{"renderedWidth":600,"renderedHeight":800,"x":100,"y":200,"width":200,"height":100}"#,
        )
        .unwrap();
        assert_eq!(p.rendered_width, 600.0);
        assert_eq!(p.y, 200.0);
    }

    #[test]
    fn test_parse_placement_rejects_missing_fields() {
        match parse_placement("signatureMeta", r#"{"x":1}"#) {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("signatureMeta")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }
}
