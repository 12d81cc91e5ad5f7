use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn document_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_documents).post(handlers::create_document))
        .route(
            "/{document_id}",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn file_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload_file))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
