use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use serde_json::{json, Value};

use auth_cell::{UpdateProfileRequest, UserService};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateLabReportRequest, UpdateLabReportRequest};
use crate::services::LabReportService;

fn lab_test_not_found() -> AppError {
    AppError::NotFound("Lab test not found".to_string())
}

#[axum::debug_handler]
pub async fn create_lab_test(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateLabReportRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    request.validate().map_err(AppError::ValidationError)?;

    let service = LabReportService::new(&config);
    let report = service.create_report(user.id, request)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!({ "lab_test": report }))))
}

#[axum::debug_handler]
pub async fn list_lab_tests(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = LabReportService::new(&config);
    let reports = service.list_reports(user.id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({ "lab_reports": reports })))
}

#[axum::debug_handler]
pub async fn get_lab_test(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(test_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = LabReportService::new(&config);
    let report = service.get_report(user.id, test_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(lab_test_not_found)?;

    Ok(Json(json!({ "lab_test": report })))
}

#[axum::debug_handler]
pub async fn update_lab_test(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(test_id): Path<i64>,
    Json(request): Json<UpdateLabReportRequest>,
) -> Result<Json<Value>, AppError> {
    let service = LabReportService::new(&config);
    let report = service.update_report(user.id, test_id, request)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(lab_test_not_found)?;

    Ok(Json(json!({ "lab_test": report })))
}

#[axum::debug_handler]
pub async fn delete_lab_test(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(test_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = LabReportService::new(&config);
    service.delete_report(user.id, test_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(lab_test_not_found)?;

    Ok(Json(json!({ "message": "Lab test deleted successfully" })))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(&config);
    let technician = service.update_profile(user.id, request).await?;

    Ok(Json(json!({ "lab_technician": technician })))
}
