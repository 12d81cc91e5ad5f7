use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use auth_cell::UserService;
use shared_config::{AppConfig, ReconciliationConfig};
use shared_database::supabase::SupabaseClient;
use shared_database::SupabaseError;
use shared_models::auth::Role;

use crate::error::AttendanceError;
use crate::models::{AttendanceRecord, CreateAttendanceRequest, ReconciliationReport};
use crate::services::reconciler::Reconciler;
use crate::services::scheduler::run_with_timeout;
use crate::store::{first_record, records, AttendanceStore, SupabaseAttendanceStore};

/// Administrative access to attendance records.
pub struct AttendanceService {
    supabase: SupabaseClient,
    users: UserService,
    store: Arc<dyn AttendanceStore>,
    default_count: i32,
    reconciliation: ReconciliationConfig,
}

impl AttendanceService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            users: UserService::new(config),
            store: Arc::new(SupabaseAttendanceStore::new(config)),
            default_count: config.attendance_default_count,
            reconciliation: config.reconciliation.clone(),
        }
    }

    pub async fn list(&self, date: Option<NaiveDate>) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        match date {
            Some(date) => self.store.list_attendance_by_date(date).await,
            None => {
                let rows: Vec<Value> = self.supabase
                    .request(Method::GET, "/rest/v1/attendance?order=date.desc,id.asc", None)
                    .await?;
                records(rows)
            }
        }
    }

    pub async fn create(&self, request: CreateAttendanceRequest) -> Result<AttendanceRecord, AttendanceError> {
        let count = request.count.unwrap_or(self.default_count);
        if count < 0 {
            return Err(AttendanceError::InvalidCount(count));
        }

        match self.users.get_user(request.doctor_id).await? {
            Some(user) if user.role == Role::Doctor => {}
            _ => return Err(AttendanceError::DoctorNotFound),
        }

        let duplicate = AttendanceError::Duplicate { doctor_id: request.doctor_id, date: request.date };

        let existing = format!(
            "/rest/v1/attendance?doctor_id=eq.{}&date=eq.{}",
            request.doctor_id, request.date
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &existing, None).await?;
        if !rows.is_empty() {
            return Err(duplicate);
        }

        debug!("Creating attendance for doctor {} on {} with count {}", request.doctor_id, request.date, count);

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "doctor_id": request.doctor_id,
            "date": request.date,
            "count": count,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now
        });

        let rows: Vec<Value> = match self.supabase
            .request(Method::POST, "/rest/v1/attendance", Some(body))
            .await
        {
            Ok(rows) => rows,
            // Lost a race with another insert for the same doctor and day.
            Err(SupabaseError::Conflict(_)) => return Err(duplicate),
            Err(e) => return Err(e.into()),
        };

        let record = first_record(rows)?.ok_or(AttendanceError::EmptyResult)?;
        info!("Attendance {} created for doctor {} on {}", record.id, record.doctor_id, record.date);
        Ok(record)
    }

    /// Run the reconciliation job once, outside the schedule.
    pub async fn reconcile_now(&self) -> Result<ReconciliationReport, AttendanceError> {
        let reconciler = Reconciler::new(self.store.clone(), self.reconciliation.max_retries);
        run_with_timeout(&reconciler, &self.reconciliation).await
    }
}
