use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{AttendanceQuery, CreateAttendanceRequest};
use crate::services::AttendanceService;

#[axum::debug_handler]
pub async fn list_attendance(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AttendanceService::new(&config);
    let attendance = service.list(query.date).await?;

    Ok(Json(json!({ "attendance": attendance })))
}

#[axum::debug_handler]
pub async fn create_attendance(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreateAttendanceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AttendanceService::new(&config);
    let record = service.create(request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "attendance": record }))))
}

#[axum::debug_handler]
pub async fn reconcile(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = AttendanceService::new(&config);
    let report = service.reconcile_now().await?;

    Ok(Json(json!({ "report": report })))
}
