use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::debug;

use appointment_cell::{AppointmentFilter, AppointmentScope, AppointmentService, StatusUpdateRequest};
use auth_cell::{UpdateProfileRequest, UserService};
use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::models::{CreateDiagnosisRequest, CreatePrescriptionRequest, RecordFilter};
use crate::services::{DiagnosisService, PrescriptionService};

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);
    let filter = AppointmentFilter {
        doctor_id: Some(user.id),
        ..AppointmentFilter::default()
    };
    let appointments = service.list_appointments(&filter).await?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);
    let appointment = service
        .get_appointment(appointment_id, AppointmentScope::Doctor(user.id))
        .await?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Doctor {} setting appointment {} to {}", user.id, appointment_id, request.status);

    let service = AppointmentService::new(&config);
    let appointment = service
        .transition(appointment_id, AppointmentScope::Doctor(user.id), Role::Doctor, request.status)
        .await?;

    Ok(Json(json!({ "appointment": appointment })))
}

// ==============================================================================
// DIAGNOSES & PRESCRIPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDiagnosisRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = DiagnosisService::new(&config);
    let diagnosis = service.create(user.id, request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "diagnosis": diagnosis }))))
}

#[axum::debug_handler]
pub async fn list_patient_diagnoses(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = DiagnosisService::new(&config);
    let diagnoses = service.list(&RecordFilter::between(user.id, patient_id)).await?;

    Ok(Json(json!({ "diagnoses": diagnoses })))
}

#[axum::debug_handler]
pub async fn create_prescription(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PrescriptionService::new(&config);
    let prescription = service.create(user.id, request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "prescription": prescription }))))
}

#[axum::debug_handler]
pub async fn list_patient_prescriptions(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = PrescriptionService::new(&config);
    let prescriptions = service.list(&RecordFilter::between(user.id, patient_id)).await?;

    Ok(Json(json!({ "prescriptions": prescriptions })))
}

// ==============================================================================
// PROFILE
// ==============================================================================

#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(&config);
    let doctor = service
        .update_profile(user.id, request)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "doctor": doctor })))
}
