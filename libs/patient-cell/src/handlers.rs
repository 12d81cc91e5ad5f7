use std::sync::Arc;

use axum::extract::{Extension, Json, State};
use serde_json::{json, Value};

use appointment_cell::{AppointmentFilter, AppointmentService};
use auth_cell::{UpdateProfileRequest, UserService};
use doctor_cell::{DiagnosisService, PrescriptionService, RecordFilter};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);
    let filter = AppointmentFilter {
        user_id: Some(user.id),
        ..AppointmentFilter::default()
    };
    let appointments = service.list_appointments(&filter).await?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn list_diagnoses(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = DiagnosisService::new(&config);
    let diagnoses = service.list(&RecordFilter::for_patient(user.id)).await?;

    Ok(Json(json!({ "diagnoses": diagnoses })))
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&config);
    let prescriptions = service.list(&RecordFilter::for_patient(user.id)).await?;

    Ok(Json(json!({ "prescriptions": prescriptions })))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(&config);
    let patient = service.update_profile(user.id, request).await?;

    Ok(Json(json!({ "patient": patient })))
}
