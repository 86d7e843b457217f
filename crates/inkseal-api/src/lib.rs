//! Inkseal API Library
//!
//! HTTP adapter over the signing lifecycle: handlers, extractors and application setup.

mod api_doc;
mod handlers;
mod telemetry;

pub mod auth;
pub mod client_ip;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
