//! Application state shared by every handler.

use inkseal_services::{DocumentLifecycle, Storage};
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::JwtVerifier;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: DocumentLifecycle,
    /// Probed by the health check.
    pub storage: Arc<dyn Storage>,
    /// `None` when the lifecycle runs on in-memory repositories.
    pub pool: Option<PgPool>,
    pub jwt: JwtVerifier,
    /// Hops at the end of `X-Forwarded-For` that belong to our own proxies.
    pub trusted_proxy_count: usize,
}

impl AppState {
    pub fn new(
        lifecycle: DocumentLifecycle,
        storage: Arc<dyn Storage>,
        pool: Option<PgPool>,
        jwt: JwtVerifier,
        trusted_proxy_count: usize,
    ) -> Self {
        Self {
            lifecycle,
            storage,
            pool,
            jwt,
            trusted_proxy_count,
        }
    }
}
