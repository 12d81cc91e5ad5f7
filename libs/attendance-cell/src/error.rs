use thiserror::Error;

use appointment_cell::AppointmentError;
use auth_cell::AuthError;
use shared_database::SupabaseError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("Attendance record {0} not found")]
    NotFound(i64),

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Attendance for doctor {doctor_id} on {date} already exists")]
    Duplicate { doctor_id: i64, date: chrono::NaiveDate },

    #[error("Attendance count cannot be negative: {0}")]
    InvalidCount(i32),

    #[error("Attendance record {0} kept changing under concurrent updates")]
    Contention(i64),

    #[error("Store returned no row")]
    EmptyResult,

    #[error("Reconciliation run exceeded {0} seconds")]
    Timeout(u64),

    #[error("Store error: {0}")]
    Store(#[from] SupabaseError),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    User(#[from] AuthError),

    #[error("Malformed attendance record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AttendanceError {
    /// Whether retrying the same write could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AttendanceError::Store(e) => e.is_transient(),
            AttendanceError::Appointment(AppointmentError::Store(e)) => e.is_transient(),
            AttendanceError::User(AuthError::Store(e)) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<AttendanceError> for AppError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::NotFound(_) | AttendanceError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AttendanceError::Duplicate { .. } | AttendanceError::Contention(_) => AppError::Conflict(err.to_string()),
            AttendanceError::InvalidCount(_) => AppError::BadRequest(err.to_string()),
            AttendanceError::Store(e) => AppError::Database(e.to_string()),
            AttendanceError::Appointment(e) => e.into(),
            AttendanceError::User(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_failures_are_transient() {
        let busy = AttendanceError::Store(SupabaseError::Api { status: 503, message: "busy".into() });
        assert!(busy.is_transient());

        let nested = AttendanceError::Appointment(AppointmentError::Store(SupabaseError::Api {
            status: 429,
            message: "slow down".into(),
        }));
        assert!(nested.is_transient());

        assert!(!AttendanceError::Store(SupabaseError::Conflict("dup".into())).is_transient());
        assert!(!AttendanceError::InvalidCount(-1).is_transient());
    }

    #[test]
    fn maps_to_http_errors() {
        assert!(matches!(AppError::from(AttendanceError::InvalidCount(-2)), AppError::BadRequest(_)));
        assert!(matches!(
            AppError::from(AttendanceError::Duplicate { doctor_id: 1, date: chrono::NaiveDate::MIN }),
            AppError::Conflict(_)
        ));
        assert!(matches!(AppError::from(AttendanceError::NotFound(4)), AppError::NotFound(_)));
    }
}
