use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AuthResponse, SigninRequest, SignupRequest};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn signup(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let service = AuthService::new(&config);
    let response = service.signup(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn signin(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<SigninRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    debug!("Signing in");
    let service = AuthService::new(&config);
    Ok(Json(service.signin(request).await?))
}

#[axum::debug_handler]
pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AuthService::new(&config);
    let account = service.me(user.id).await?;
    Ok(Json(json!({ "user": account })))
}
