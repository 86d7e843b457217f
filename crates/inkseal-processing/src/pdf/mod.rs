//! PDF handling: structural inspection, coordinate mapping and signature embedding.

mod embed;
mod placement;

pub use embed::{embed_signature, SignedPdf};
pub use placement::{map_to_page_space, PageGeometry};

use inkseal_core::AppError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Errors from PDF inspection and signature embedding
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("Document is not a readable PDF: {0}")]
    InvalidDocument(String),

    #[error("Signature is not a decodable PNG image: {0}")]
    InvalidSignatureImage(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Invalid signature placement: {0}")]
    InvalidPlacement(String),
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::InvalidDocument(msg) => AppError::InvalidDocument(msg),
            PdfError::InvalidSignatureImage(msg) => AppError::InvalidSignatureImage(msg),
            PdfError::EmptyDocument => {
                AppError::EmptyDocument("The PDF does not contain any pages".to_string())
            }
            PdfError::InvalidPlacement(msg) => AppError::InvalidInput(msg),
        }
    }
}

/// Structural facts about an uploaded PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfInfo {
    pub page_count: u32,
    pub first_page: PageGeometry,
}

/// Letter size, used when a page and its ancestors carry no usable MediaBox.
const FALLBACK_PAGE: PageGeometry = PageGeometry {
    origin_x: 0.0,
    origin_y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// Parse `bytes` and require at least one page.
pub fn inspect(bytes: &[u8]) -> Result<PdfInfo, PdfError> {
    let doc = load(bytes)?;
    let (_, page_id) = first_page(&doc)?;
    Ok(PdfInfo {
        page_count: doc.get_pages().len() as u32,
        first_page: page_geometry(&doc, page_id)?,
    })
}

pub(crate) fn load(bytes: &[u8]) -> Result<Document, PdfError> {
    Document::load_mem(bytes).map_err(|e| PdfError::InvalidDocument(e.to_string()))
}

pub(crate) fn first_page(doc: &Document) -> Result<(u32, ObjectId), PdfError> {
    doc.get_pages()
        .into_iter()
        .next()
        .ok_or(PdfError::EmptyDocument)
}

pub(crate) fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, PdfError> {
    doc.get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|_| PdfError::InvalidDocument("page object is not a dictionary".to_string()))
}

/// Resolve the page's MediaBox, walking up the page tree for inherited values.
pub(crate) fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry, PdfError> {
    let mut current = Some(page_id);
    let mut depth = 0;
    while let Some(id) = current {
        depth += 1;
        if depth > 64 {
            return Err(PdfError::InvalidDocument(
                "page tree is too deep or cyclic".to_string(),
            ));
        }
        let dict = page_dict(doc, id)?;
        if let Some(geometry) = extract_media_box(doc, dict) {
            return Ok(geometry);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }

    tracing::warn!(
        page_id = ?page_id,
        "No MediaBox found for page, assuming US Letter"
    );
    Ok(FALLBACK_PAGE)
}

fn extract_media_box(doc: &Document, dict: &Dictionary) -> Option<PageGeometry> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = obj_to_f64(&arr[0])?;
    let lly = obj_to_f64(&arr[1])?;
    let urx = obj_to_f64(&arr[2])?;
    let ury = obj_to_f64(&arr[3])?;

    let geometry = PageGeometry {
        origin_x: llx.min(urx),
        origin_y: lly.min(ury),
        width: (urx - llx).abs(),
        height: (ury - lly).abs(),
    };
    if geometry.width > 0.0 && geometry.height > 0.0 {
        Some(geometry)
    } else {
        None
    }
}

fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}
