use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Rectangle in PDF user space (points, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Where a signature image was embedded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignaturePlacement {
    /// 1-based page number
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SignaturePlacement {
    pub fn on_page(page: u32, rect: PdfRect) -> Self {
        Self {
            page,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }

    pub fn rect(&self) -> PdfRect {
        PdfRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Signature box as placed on the rendered page, in screen pixels (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScreenPlacement {
    pub rendered_width: f64,
    pub rendered_height: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Who performed a lifecycle action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Authenticated owner
    User(Uuid),
    /// Token holder whose address is known from the share
    Recipient(String),
    /// Token holder with no recorded address
    External,
}

impl Actor {
    /// Actor for token-path events on a document shared with `shared_with`.
    pub fn for_recipient(shared_with: Option<&str>) -> Self {
        match shared_with {
            Some(email) if !email.is_empty() => Actor::Recipient(email.to_string()),
            _ => Actor::External,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::User(id) => write!(f, "{}", id),
            Actor::Recipient(email) => write!(f, "{}", email),
            Actor::External => write!(f, "{}", crate::constants::EXTERNAL_ACTOR),
        }
    }
}
