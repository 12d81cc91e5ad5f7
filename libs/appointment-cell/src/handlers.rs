// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentFilter, AppointmentScope, AppointmentStatus, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::AppointmentService;

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AppointmentService::new(&config);
    let appointment = service.create_appointment(user.id, request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "appointment": appointment }))))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Listing appointments for user {}", user.id);

    let service = AppointmentService::new(&config);
    let filter = AppointmentFilter {
        user_id: Some(user.id),
        ..AppointmentFilter::default()
    };
    let appointments = service.list_appointments(&filter).await?;
    let appointments = service.with_doctors(appointments).await?;

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
        .get_appointment(appointment_id, AppointmentScope::Patient(user.id))
        .await?;
    let details = service
        .with_doctors(vec![appointment])
        .await?
        .pop()
        .ok_or(AppointmentError::NotFound)?;

    Ok(Json(json!({ "appointment": details })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);
    let appointment = service
        .update_details(appointment_id, AppointmentScope::Patient(user.id), request)
        .await?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&config);

    // The caller acts as the booking patient here whatever their account role.
    let appointment = service
        .transition(
            appointment_id,
            AppointmentScope::Patient(user.id),
            Role::Patient,
            AppointmentStatus::Cancelled,
        )
        .await?;

    Ok(Json(json!({
        "message": "Appointment cancelled",
        "appointment": appointment
    })))
}
