//! Fixed protocol constants.

/// Share links stay valid for this many days after they are issued.
pub const SHARE_TOKEN_VALIDITY_DAYS: i64 = 7;

/// Random bytes per share token; rendered as twice as many hex characters.
pub const SHARE_TOKEN_BYTES: usize = 32;

/// Attempts at drawing a token that no other document already holds.
pub const SHARE_TOKEN_MAX_ATTEMPTS: usize = 5;

/// Signatures are always embedded on the first page.
pub const SIGNATURE_TARGET_PAGE: u32 = 1;

/// Actor recorded for token-path events when no recipient address is known.
pub const EXTERNAL_ACTOR: &str = "external";

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

pub const DEFAULT_MAX_DOCUMENT_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Audit pagination defaults.
pub const AUDIT_DEFAULT_LIMIT: i64 = 50;
pub const AUDIT_MAX_LIMIT: i64 = 500;

pub const API_PREFIX: &str = "/api/v1";

/// Path segment of the public page that renders a share link.
pub const EXTERNAL_SIGN_PATH: &str = "external-sign";
