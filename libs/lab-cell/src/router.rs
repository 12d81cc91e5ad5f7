use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
    middleware,
};

use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::extractor::{auth_middleware, require_role};

use crate::handlers;

const LAB_TECHNICIAN_ONLY: &[Role] = &[Role::LabTechnician];

pub fn lab_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/tests", get(handlers::list_lab_tests).post(handlers::create_lab_test))
        .route(
            "/tests/{test_id}",
            get(handlers::get_lab_test)
                .put(handlers::update_lab_test)
                .delete(handlers::delete_lab_test),
        )
        .route("/profile", put(handlers::update_profile))
        .route_layer(middleware::from_fn_with_state(LAB_TECHNICIAN_ONLY, require_role))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
