use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use appointment_cell::{Appointment, AppointmentFilter, AppointmentScope, AppointmentService, AppointmentStatus};
use auth_cell::{UserAccount, UserService};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::AttendanceError;
use crate::models::AttendanceRecord;

/// Store operations the reconciliation job depends on. Both writes are
/// conditional: they return `None` when the row no longer matches the
/// expected value and nothing was changed.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn list_attendance_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AttendanceError>;

    async fn get_attendance(&self, id: i64) -> Result<Option<AttendanceRecord>, AttendanceError>;

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AttendanceError>;

    async fn update_appointment_status(
        &self,
        id: i64,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AttendanceError>;

    async fn update_attendance_count(
        &self,
        id: i64,
        expected: i32,
        count: i32,
    ) -> Result<Option<AttendanceRecord>, AttendanceError>;

    async fn get_user_by_id(&self, id: i64) -> Result<Option<UserAccount>, AttendanceError>;
}

pub(crate) fn first_record(rows: Vec<Value>) -> Result<Option<AttendanceRecord>, AttendanceError> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn records(rows: Vec<Value>) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    Ok(rows
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<AttendanceRecord>, _>>()?)
}

/// PostgREST-backed store.
pub struct SupabaseAttendanceStore {
    supabase: SupabaseClient,
    appointments: AppointmentService,
    users: UserService,
}

impl SupabaseAttendanceStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            appointments: AppointmentService::new(config),
            users: UserService::new(config),
        }
    }
}

#[async_trait]
impl AttendanceStore for SupabaseAttendanceStore {
    async fn list_attendance_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        debug!("Loading attendance for {}", date);

        let path = format!("/rest/v1/attendance?date=eq.{}&order=id.asc", date);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        records(rows)
    }

    async fn get_attendance(&self, id: i64) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let path = format!("/rest/v1/attendance?id=eq.{}", id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        first_record(rows)
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AttendanceError> {
        Ok(self.appointments.list_appointments(filter).await?)
    }

    async fn update_appointment_status(
        &self,
        id: i64,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AttendanceError> {
        Ok(self.appointments
            .update_status_if(id, AppointmentScope::Any, expected, status)
            .await?)
    }

    async fn update_attendance_count(
        &self,
        id: i64,
        expected: i32,
        count: i32,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        if count < 0 {
            return Err(AttendanceError::InvalidCount(count));
        }

        let path = format!("/rest/v1/attendance?id=eq.{}&count=eq.{}", id, expected);
        let body = json!({
            "count": count,
            "updated_at": Utc::now().to_rfc3339()
        });
        let rows: Vec<Value> = self.supabase.request(Method::PATCH, &path, Some(body)).await?;
        first_record(rows)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<UserAccount>, AttendanceError> {
        Ok(self.users.get_user(id).await?)
    }
}
