use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::discovery::orchestrator::DiscoveryOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Kept for handlers that talk to the database directly.
    #[allow(dead_code)]
    pub db: PgPool,
    #[allow(dead_code)]
    pub config: Config,
    pub orchestrator: Arc<DiscoveryOrchestrator>,
}
