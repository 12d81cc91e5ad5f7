use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use auth_cell::AuthError;
use shared_database::SupabaseError;
use shared_models::error::AppError;

// ==============================================================================
// CLINICAL RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnosis {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub diagnosis: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDiagnosisRequest {
    pub patient_id: i64,
    pub diagnosis: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: i64,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDiagnosisRequest {
    pub diagnosis: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub medication: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Who a clinical record listing is restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl RecordFilter {
    pub fn for_patient(patient_id: i64) -> Self {
        Self { patient_id: Some(patient_id), doctor_id: None }
    }

    pub fn between(doctor_id: i64, patient_id: i64) -> Self {
        Self { patient_id: Some(patient_id), doctor_id: Some(doctor_id) }
    }

    pub fn to_query(&self) -> String {
        let mut parts = Vec::new();
        if let Some(patient_id) = self.patient_id {
            parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = self.doctor_id {
            parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        parts.push("order=id.asc".to_string());
        parts.join("&")
    }
}

// ==============================================================================
// DOCTOR PROFILE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorProfile {
    pub id: i64,
    pub user_id: i64,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub years_of_experience: Option<i32>,
}

/// Body of the admin "change to doctor" action. Both identifying fields
/// are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeToDoctorRequest {
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub years_of_experience: Option<i32>,
}

impl ChangeToDoctorRequest {
    pub fn validate(&self) -> Result<(&str, &str), DoctorError> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        match (present(&self.specialization), present(&self.license_number)) {
            (Some(specialization), Some(license_number)) => Ok((specialization, license_number)),
            _ => Err(DoctorError::Validation(
                "Specialization and license number are required".to_string(),
            )),
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("License number is already registered")]
    LicenseInUse,

    #[error("Store returned no row")]
    EmptyResult,

    #[error(transparent)]
    Store(#[from] SupabaseError),

    #[error(transparent)]
    User(#[from] AuthError),

    #[error("Malformed record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) | DoctorError::PatientNotFound => AppError::NotFound(err.to_string()),
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::LicenseInUse => AppError::Conflict(err.to_string()),
            DoctorError::Store(e) => AppError::Database(e.to_string()),
            DoctorError::User(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}
