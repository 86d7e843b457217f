//! Inkseal document processing
//!
//! Upload validation, on-screen to PDF coordinate mapping, and signature embedding.
//! Everything here is synchronous and CPU-bound; async callers should run it on a
//! blocking thread.

pub mod pdf;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod testing;
pub mod validator;

pub use pdf::{
    embed_signature, inspect, map_to_page_space, PageGeometry, PdfError, PdfInfo, SignedPdf,
};
pub use validator::{sanitize_file_name, PdfValidator, ValidationError};
