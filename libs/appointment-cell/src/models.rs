// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::supabase::encode;
use shared_database::SupabaseError;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    /// Patient who booked the appointment.
    pub user_id: i64,
    /// User id of the doctor.
    pub doctor_id: i64,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Doctor details shown next to a patient's appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorSummary {
    pub id: i64,
    pub full_name: Option<String>,
    pub specialization: Option<String>,
}

/// An appointment joined with its doctor. `doctor` is `None` when the doctor's
/// user row no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentWithDoctor {
    pub appointment: Appointment,
    pub doctor: Option<DoctorSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    #[serde(alias = "appointed")]
    Serviced,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Serviced => "serviced",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-level restriction applied to appointment reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    Patient(i64),
    Doctor(i64),
    Any,
}

impl AppointmentScope {
    pub(crate) fn filter(&self) -> String {
        match self {
            AppointmentScope::Patient(id) => format!("&user_id=eq.{}", id),
            AppointmentScope::Doctor(id) => format!("&doctor_id=eq.{}", id),
            AppointmentScope::Any => String::new(),
        }
    }
}

/// Filter for appointment listings. Empty filter lists everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub user_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub scheduled_from: Option<DateTime<Utc>>,
    pub scheduled_until: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    pub fn scheduled() -> Self {
        Self {
            status: Some(AppointmentStatus::Scheduled),
            ..Self::default()
        }
    }

    /// PostgREST query string, ordered by scheduled time then id so callers
    /// see a stable earliest-first order.
    pub fn to_query(&self) -> String {
        let mut parts = Vec::new();

        if let Some(user_id) = self.user_id {
            parts.push(format!("user_id=eq.{}", user_id));
        }
        if let Some(doctor_id) = self.doctor_id {
            parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(status) = self.status {
            parts.push(format!("status=eq.{}", status));
        }
        if let Some(from) = self.scheduled_from {
            parts.push(format!("datetime=gte.{}", encode(from.to_rfc3339())));
        }
        if let Some(until) = self.scheduled_until {
            parts.push(format!("datetime=lte.{}", encode(until.to_rfc3339())));
        }
        parts.push("order=datetime.asc,id.asc".to_string());

        parts.join("&")
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: i64,
    pub datetime: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Patient-side edit of a still scheduled appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: i64,
    pub datetime: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUpdateAppointmentRequest {
    pub user_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub datetime: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Cannot change appointment from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment cannot be modified in current status: {0}")]
    NotModifiable(AppointmentStatus),

    #[error("Appointment was modified concurrently")]
    ConcurrentModification,

    #[error("Store returned no row")]
    EmptyResult,

    #[error(transparent)]
    Store(#[from] SupabaseError),

    #[error("Malformed appointment record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidTime(msg) => AppError::BadRequest(msg),
            AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::NotModifiable(_)
            | AppointmentError::ConcurrentModification => AppError::Conflict(err.to_string()),
            AppointmentError::Store(e) => AppError::Database(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}
