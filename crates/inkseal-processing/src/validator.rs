use inkseal_core::constants::PDF_CONTENT_TYPE;
use inkseal_core::AppError;
use std::path::Path;

/// Validation errors for uploaded documents
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {0} (only .pdf is accepted)")]
    InvalidExtension(String),

    #[error("Invalid content type: {0} (only application/pdf is accepted)")]
    InvalidContentType(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("File does not start with a PDF header")]
    NotPdf,

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            ValidationError::NotPdf => AppError::InvalidDocument(err.to_string()),
            _ => AppError::InvalidInput(err.to_string()),
        }
    }
}

/// Upload validator for PDF documents
///
/// Checks the declared name and type plus the leading bytes; structural parsing
/// happens later in [`crate::pdf::inspect`].
pub struct PdfValidator {
    max_file_size: usize,
}

impl PdfValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if extension != "pdf" {
            return Err(ValidationError::InvalidExtension(extension));
        }

        Ok(())
    }

    /// Validate content type; parameters such as `; charset=` are ignored
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        // Browsers send this for unknown types; the magic check still applies.
        if essence == "application/octet-stream" {
            return Ok(());
        }

        if essence != PDF_CONTENT_TYPE {
            return Err(ValidationError::InvalidContentType(content_type.to_string()));
        }

        Ok(())
    }

    /// `%PDF-` must appear within the first KiB.
    pub fn validate_magic(&self, data: &[u8]) -> Result<(), ValidationError> {
        let head = &data[..data.len().min(1024)];
        if head.windows(5).any(|w| w == b"%PDF-") {
            Ok(())
        } else {
            Err(ValidationError::NotPdf)
        }
    }

    /// Validate all aspects of an upload
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<(), ValidationError> {
        self.validate_file_size(data.len())?;
        self.validate_extension(filename)?;
        if let Some(content_type) = content_type {
            self.validate_content_type(content_type)?;
        }
        self.validate_magic(data)?;
        Ok(())
    }
}

/// Reduce a client-supplied name to its final path component.
pub fn sanitize_file_name(raw: &str) -> Result<String, ValidationError> {
    let candidate = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return Err(ValidationError::InvalidFilename(raw.to_string()));
    }
    if candidate.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFilename(raw.to_string()));
    }

    Ok(candidate.to_string())
}
