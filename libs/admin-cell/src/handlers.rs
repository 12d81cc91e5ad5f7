use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::info;

use appointment_cell::{AdminUpdateAppointmentRequest, AppointmentFilter, AppointmentScope, AppointmentService};
use auth_cell::{AdminUpdateUserRequest, AuthError, AuthService, SignupRequest, UserListQuery, UserService};
use doctor_cell::{
    ChangeToDoctorRequest, DiagnosisService, DoctorProfileService, PrescriptionService, RecordFilter,
    UpdateDiagnosisRequest, UpdatePrescriptionRequest,
};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

const DEFAULT_PAGE_SIZE: u32 = 100;

// ==============================================================================
// USERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_users(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(&config);
    let users = service
        .list_users(query.skip.unwrap_or(0), query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;

    Ok(Json(json!({ "users": users })))
}

#[axum::debug_handler]
pub async fn create_user(
    State(config): State<Arc<AppConfig>>,
    Extension(admin): Extension<User>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AuthService::new(&config);
    let user = service.create_account(request).await?;
    info!("Admin {} created user {}", admin.id, user.id);

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

#[axum::debug_handler]
pub async fn get_user(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(&config);
    let user = service.get_user(user_id).await?.ok_or(AuthError::NotFound)?;

    Ok(Json(json!({ "user": user })))
}

#[axum::debug_handler]
pub async fn update_user(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<i64>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    let service = UserService::new(&config);
    let user = service.admin_update(user_id, request).await?;

    Ok(Json(json!({ "user": user })))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(config): State<Arc<AppConfig>>,
    Extension(admin): Extension<User>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if admin.id == user_id {
        return Err(AppError::BadRequest("Administrators cannot delete their own account".to_string()));
    }

    let service = UserService::new(&config);
    let user = service.delete_user(user_id).await?;
    info!("Admin {} deleted user {}", admin.id, user_id);

    Ok(Json(json!({ "message": "User deleted successfully", "user": user })))
}

#[axum::debug_handler]
pub async fn change_to_doctor(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<i64>,
    Json(request): Json<ChangeToDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorProfileService::new(&config);
    let promoted = service.promote(user_id, request).await?;

    Ok(Json(json!({
        "message": "User role changed to doctor successfully",
        "data": promoted
    })))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);
    let appointments = service.list_appointments(&AppointmentFilter::default()).await?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);
    let appointment = service.get_appointment(appointment_id, AppointmentScope::Any).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<AdminUpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);
    let appointment = service.admin_update(appointment_id, request).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(config): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);
    let appointment = service.delete_appointment(appointment_id, AppointmentScope::Any).await?;

    Ok(Json(json!({ "message": "Appointment deleted successfully", "appointment": appointment })))
}

// ==============================================================================
// DIAGNOSES & PRESCRIPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_diagnoses(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let diagnoses = DiagnosisService::new(&config).list(&RecordFilter::default()).await?;
    Ok(Json(json!({ "diagnoses": diagnoses })))
}

#[axum::debug_handler]
pub async fn get_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Path(diagnosis_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let diagnosis = DiagnosisService::new(&config).get(diagnosis_id).await?;
    Ok(Json(json!({ "diagnosis": diagnosis })))
}

#[axum::debug_handler]
pub async fn update_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Path(diagnosis_id): Path<i64>,
    Json(request): Json<UpdateDiagnosisRequest>,
) -> Result<Json<Value>, AppError> {
    let diagnosis = DiagnosisService::new(&config).update(diagnosis_id, request).await?;
    Ok(Json(json!({ "diagnosis": diagnosis })))
}

#[axum::debug_handler]
pub async fn delete_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Path(diagnosis_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let diagnosis = DiagnosisService::new(&config).delete(diagnosis_id).await?;
    Ok(Json(json!({ "message": "Diagnosis deleted successfully", "diagnosis": diagnosis })))
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let prescriptions = PrescriptionService::new(&config).list(&RecordFilter::default()).await?;
    Ok(Json(json!({ "prescriptions": prescriptions })))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(config): State<Arc<AppConfig>>,
    Path(prescription_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let prescription = PrescriptionService::new(&config).get(prescription_id).await?;
    Ok(Json(json!({ "prescription": prescription })))
}

#[axum::debug_handler]
pub async fn update_prescription(
    State(config): State<Arc<AppConfig>>,
    Path(prescription_id): Path<i64>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let prescription = PrescriptionService::new(&config).update(prescription_id, request).await?;
    Ok(Json(json!({ "prescription": prescription })))
}

#[axum::debug_handler]
pub async fn delete_prescription(
    State(config): State<Arc<AppConfig>>,
    Path(prescription_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let prescription = PrescriptionService::new(&config).delete(prescription_id).await?;
    Ok(Json(json!({ "message": "Prescription deleted successfully", "prescription": prescription })))
}
