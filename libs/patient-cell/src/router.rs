use std::sync::Arc;

use axum::{middleware, routing::{get, put}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// The caller's own records. Open to any authenticated user.
pub fn patient_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointments", get(handlers::list_appointments))
        .route("/diagnoses", get(handlers::list_diagnoses))
        .route("/prescriptions", get(handlers::list_prescriptions))
        .route("/profile", put(handlers::update_profile))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
