use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use admin_cell::admin_routes;
use appointment_cell::appointment_routes;
use auth_cell::auth_routes;
use doctor_cell::doctor_routes;
use document_cell::{document_routes, file_routes};
use lab_cell::lab_routes;
use patient_cell::patient_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/patient", patient_routes(state.clone()))
        .nest("/doctor", doctor_routes(state.clone()))
        .nest("/lab", lab_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone()))
        .nest("/documents", document_routes(state.clone()))
        .nest("/files", file_routes(state))
}
