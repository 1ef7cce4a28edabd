use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Built once in `main`; read-only for every request.
    pub orchestrator: Arc<Orchestrator>,
}
