use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use attendance_cell::attendance_routes;
use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::extractor::{auth_middleware, require_role};

use crate::handlers;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

pub fn admin_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Users
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/{user_id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/change-to-doctor/{user_id}", post(handlers::change_to_doctor))

        // Appointments
        .route("/appointments", get(handlers::list_appointments))
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )

        // Clinical records
        .route("/diagnoses", get(handlers::list_diagnoses))
        .route(
            "/diagnoses/{diagnosis_id}",
            get(handlers::get_diagnosis)
                .put(handlers::update_diagnosis)
                .delete(handlers::delete_diagnosis),
        )
        .route("/prescriptions", get(handlers::list_prescriptions))
        .route(
            "/prescriptions/{prescription_id}",
            get(handlers::get_prescription)
                .put(handlers::update_prescription)
                .delete(handlers::delete_prescription),
        )
        .with_state(state.clone())

        // Attendance and the manual reconciliation trigger
        .nest("/attendance", attendance_routes(state.clone()))
        .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, require_role))
        .layer(middleware::from_fn_with_state(state, auth_middleware))
}
