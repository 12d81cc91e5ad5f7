use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::extractor::{auth_middleware, require_role};

use crate::handlers;

const DOCTOR_ONLY: &[Role] = &[Role::Doctor];

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Appointments assigned to the calling doctor
        .route("/appointments", get(handlers::list_appointments))
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment).put(handlers::update_appointment_status),
        )

        // Clinical records
        .route("/diagnoses", post(handlers::create_diagnosis))
        .route("/diagnoses/{patient_id}", get(handlers::list_patient_diagnoses))
        .route("/prescriptions", post(handlers::create_prescription))
        .route("/prescriptions/{patient_id}", get(handlers::list_patient_prescriptions))

        .route("/profile", put(handlers::update_profile))
        .route_layer(middleware::from_fn_with_state(DOCTOR_ONLY, require_role))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
