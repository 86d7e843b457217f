//! Data models for the application
//!
//! Each sub-module represents a specific feature area of the signing service.

mod audit;
mod document;
mod placement;

// Re-export all models for convenient imports
pub use audit::*;
pub use document::*;
pub use placement::*;
