#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use appointment_cell::{Appointment, AppointmentFilter, AppointmentStatus};
use attendance_cell::{AttendanceError, AttendanceRecord, AttendanceStore};
use auth_cell::UserAccount;
use shared_database::SupabaseError;
use shared_utils::test_utils::MockSupabaseResponses;

pub fn at(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

pub fn day(raw: &str) -> NaiveDate {
    raw.parse().unwrap()
}

pub fn appointment(id: i64, doctor_id: i64, datetime: &str, status: AppointmentStatus) -> Appointment {
    Appointment {
        id,
        user_id: 100 + id,
        doctor_id,
        datetime: at(datetime),
        status,
        notes: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn attendance(id: i64, doctor_id: i64, date: &str, count: i32) -> AttendanceRecord {
    AttendanceRecord {
        id,
        doctor_id,
        date: day(date),
        count,
        notes: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn doctor(id: i64) -> UserAccount {
    serde_json::from_value(MockSupabaseResponses::user_row(id, "doctor")).unwrap()
}

fn transient() -> AttendanceError {
    AttendanceError::Store(SupabaseError::Api { status: 503, message: "unavailable".to_string() })
}

fn permanent() -> AttendanceError {
    AttendanceError::Store(SupabaseError::Api { status: 400, message: "bad request".to_string() })
}

/// Injected misbehaviour.
#[derive(Default)]
pub struct Faults {
    /// Status writes that fail with a non-transient error.
    pub broken_status: HashSet<i64>,
    /// Number of upcoming status writes that fail transiently without applying.
    pub transient_status_failures: u32,
    /// Status writes that apply but whose response is lost once.
    pub lost_status_responses: HashSet<i64>,
    /// Appointments another writer cancels just before the job reaches them.
    pub cancelled_under_us: HashSet<i64>,
    /// Attendance records another writer decrements before the first swap.
    pub external_decrement: HashMap<i64, i32>,
    pub users_unavailable: bool,
    pub appointments_unavailable: bool,
    /// Delay before every status write.
    pub slow_status: Option<Duration>,
}

#[derive(Default)]
struct State {
    attendance: BTreeMap<i64, AttendanceRecord>,
    appointments: BTreeMap<i64, Appointment>,
    users: HashMap<i64, UserAccount>,
    faults: Faults,
    count_writes: usize,
}

/// Store held in memory. Every call yields first so concurrent runs
/// interleave between store operations.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new(
        attendance: Vec<AttendanceRecord>,
        appointments: Vec<Appointment>,
        users: Vec<UserAccount>,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                attendance: attendance.into_iter().map(|a| (a.id, a)).collect(),
                appointments: appointments.into_iter().map(|a| (a.id, a)).collect(),
                users: users.into_iter().map(|u| (u.id, u)).collect(),
                ..State::default()
            }),
        }
    }

    pub async fn with_faults(self, faults: Faults) -> Self {
        self.state.lock().await.faults = faults;
        self
    }

    pub async fn count(&self, attendance_id: i64) -> i32 {
        self.state.lock().await.attendance[&attendance_id].count
    }

    pub async fn status(&self, appointment_id: i64) -> AppointmentStatus {
        self.state.lock().await.appointments[&appointment_id].status
    }

    pub async fn serviced_ids(&self) -> Vec<i64> {
        self.state
            .lock()
            .await
            .appointments
            .values()
            .filter(|a| a.status == AppointmentStatus::Serviced)
            .map(|a| a.id)
            .collect()
    }

    pub async fn count_writes(&self) -> usize {
        self.state.lock().await.count_writes
    }
}

fn matches(filter: &AppointmentFilter, appointment: &Appointment) -> bool {
    filter.user_id.map_or(true, |id| appointment.user_id == id)
        && filter.doctor_id.map_or(true, |id| appointment.doctor_id == id)
        && filter.status.map_or(true, |status| appointment.status == status)
        && filter.scheduled_from.map_or(true, |from| appointment.datetime >= from)
        && filter.scheduled_until.map_or(true, |until| appointment.datetime <= until)
}

#[async_trait]
impl AttendanceStore for InMemoryStore {
    async fn list_attendance_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        Ok(state.attendance.values().filter(|a| a.date == date).cloned().collect())
    }

    async fn get_attendance(&self, id: i64) -> Result<Option<AttendanceRecord>, AttendanceError> {
        tokio::task::yield_now().await;
        Ok(self.state.lock().await.attendance.get(&id).cloned())
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AttendanceError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        if state.faults.appointments_unavailable {
            return Err(permanent());
        }

        let mut rows: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| matches(filter, a))
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.datetime, a.id));
        Ok(rows)
    }

    async fn update_appointment_status(
        &self,
        id: i64,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AttendanceError> {
        let delay = self.state.lock().await.faults.slow_status;
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        let mut state = self.state.lock().await;

        if state.faults.broken_status.contains(&id) {
            return Err(permanent());
        }
        if state.faults.transient_status_failures > 0 {
            state.faults.transient_status_failures -= 1;
            return Err(transient());
        }
        if state.faults.cancelled_under_us.remove(&id) {
            if let Some(row) = state.appointments.get_mut(&id) {
                row.status = AppointmentStatus::Cancelled;
            }
        }

        let lose_response = state.faults.lost_status_responses.remove(&id);
        let updated = match state.appointments.get_mut(&id) {
            Some(row) if row.status == expected => {
                row.status = status;
                Some(row.clone())
            }
            _ => None,
        };

        if lose_response && updated.is_some() {
            return Err(transient());
        }
        Ok(updated)
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

        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;

        if let Some(delta) = state.faults.external_decrement.remove(&id) {
            if let Some(row) = state.attendance.get_mut(&id) {
                row.count -= delta;
            }
        }

        match state.attendance.get_mut(&id) {
            Some(row) if row.count == expected => {
                row.count = count;
                let updated = row.clone();
                state.count_writes += 1;
                Ok(Some(updated))
            }
            _ => Ok(None),
        }
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<UserAccount>, AttendanceError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        if state.faults.users_unavailable {
            return Err(transient());
        }
        Ok(state.users.get(&id).cloned())
    }
}
