pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job intake and tracking
        .route("/api/v1/jobs/intake", post(handlers::handle_intake))
        .route("/api/v1/jobs", get(handlers::handle_list_jobs))
        .route(
            "/api/v1/jobs/:job_id/status",
            patch(handlers::handle_update_status),
        )
        // Generation
        .route("/api/v1/checklist", post(handlers::handle_checklist))
        .route("/api/v1/report", get(handlers::handle_report))
        // Spreadsheet sync
        .route("/api/v1/sync/push", post(handlers::handle_sync_push))
        .route("/api/v1/sync/pull", post(handlers::handle_sync_pull))
        .with_state(state)
}
