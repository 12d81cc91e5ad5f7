use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers;

/// Attendance administration. Carries no auth layers of its own; mount it
/// behind the admin guard.
pub fn attendance_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_attendance).post(handlers::create_attendance))
        .route("/reconcile", post(handlers::reconcile))
        .with_state(state)
}
