// libs/appointment-cell/src/services/appointment.rs
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use auth_cell::UserService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Role;

use crate::models::{
    AdminUpdateAppointmentRequest, Appointment, AppointmentError, AppointmentFilter,
    AppointmentScope, AppointmentStatus, AppointmentWithDoctor, CreateAppointmentRequest,
    DoctorSummary, UpdateAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentService {
    supabase: SupabaseClient,
    users: UserService,
}

#[derive(Deserialize)]
struct DoctorName {
    id: i64,
    full_name: Option<String>,
}

#[derive(Deserialize)]
struct DoctorSpecialization {
    user_id: i64,
    specialization: Option<String>,
}

fn rows_as<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, AppointmentError> {
    Ok(rows
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()?)
}

fn first_appointment(rows: Vec<Value>) -> Result<Option<Appointment>, AppointmentError> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            users: UserService::new(config),
        }
    }

    async fn ensure_doctor(&self, doctor_id: i64) -> Result<(), AppointmentError> {
        let doctor = self.users
            .get_user(doctor_id)
            .await
            .map_err(|e| {
                warn!("Doctor lookup for {} failed: {}", doctor_id, e);
                AppointmentError::DoctorNotFound
            })?;

        match doctor {
            Some(user) if user.role == Role::Doctor => Ok(()),
            _ => Err(AppointmentError::DoctorNotFound),
        }
    }

    fn ensure_future(datetime: DateTime<Utc>) -> Result<(), AppointmentError> {
        if datetime < Utc::now() {
            return Err(AppointmentError::InvalidTime(
                "Appointment time cannot be in the past".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create_appointment(
        &self,
        patient_id: i64,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Creating appointment for patient {} with doctor {}", patient_id, request.doctor_id);

        Self::ensure_future(request.datetime)?;
        self.ensure_doctor(request.doctor_id).await?;

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "user_id": patient_id,
            "doctor_id": request.doctor_id,
            "datetime": request.datetime.to_rfc3339(),
            "status": AppointmentStatus::Scheduled,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now
        });

        let rows: Vec<Value> = self.supabase
            .request(Method::POST, "/rest/v1/appointments", Some(body))
            .await?;

        let appointment = first_appointment(rows)?.ok_or(AppointmentError::EmptyResult)?;
        info!("Appointment {} booked for {}", appointment.id, appointment.datetime);
        Ok(appointment)
    }

    pub async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?{}", filter.to_query());
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()?)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: i64,
        scope: AppointmentScope,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {} ({:?})", appointment_id, scope);

        let path = format!("/rest/v1/appointments?id=eq.{}{}", appointment_id, scope.filter());
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        first_appointment(rows)?.ok_or(AppointmentError::NotFound)
    }

    /// Reschedule or re-assign an appointment that is still scheduled.
    pub async fn update_details(
        &self,
        appointment_id: i64,
        scope: AppointmentScope,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, scope).await?;
        if current.status.is_terminal() {
            return Err(AppointmentError::NotModifiable(current.status));
        }

        Self::ensure_future(request.datetime)?;
        if request.doctor_id != current.doctor_id {
            self.ensure_doctor(request.doctor_id).await?;
        }

        let mut update = Map::new();
        update.insert("doctor_id".to_string(), json!(request.doctor_id));
        update.insert("datetime".to_string(), json!(request.datetime.to_rfc3339()));
        if let Some(notes) = request.notes {
            update.insert("notes".to_string(), json!(notes));
        }

        // Guard on status so a concurrent reconciliation cannot be overwritten.
        self.patch_if_status(appointment_id, scope, AppointmentStatus::Scheduled, update)
            .await?
            .ok_or(AppointmentError::ConcurrentModification)
    }

    /// Move an appointment out of `scheduled` on behalf of a user.
    pub async fn transition(
        &self,
        appointment_id: i64,
        scope: AppointmentScope,
        role: Role,
        to: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, scope).await?;

        if !AppointmentLifecycleService::role_may_set(role, to) {
            return Err(AppointmentError::InvalidStatusTransition { from: current.status, to });
        }
        AppointmentLifecycleService::validate_status_transition(current.status, to)?;

        self.update_status_if(appointment_id, scope, current.status, to)
            .await?
            .ok_or(AppointmentError::ConcurrentModification)
    }

    /// Compare-and-set on status. `None` means the row was no longer in
    /// `expected` (or is outside `scope`) and nothing was written.
    pub async fn update_status_if(
        &self,
        appointment_id: i64,
        scope: AppointmentScope,
        expected: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let mut update = Map::new();
        update.insert("status".to_string(), json!(to));

        let updated = self.patch_if_status(appointment_id, scope, expected, update).await?;
        if let Some(appointment) = &updated {
            info!("Appointment {} moved {} -> {}", appointment.id, expected, to);
        }
        Ok(updated)
    }

    pub async fn admin_update(
        &self,
        appointment_id: i64,
        request: AdminUpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, AppointmentScope::Any).await?;

        let mut update = Map::new();
        if let Some(user_id) = request.user_id {
            update.insert("user_id".to_string(), json!(user_id));
        }
        if let Some(doctor_id) = request.doctor_id {
            if doctor_id != current.doctor_id {
                self.ensure_doctor(doctor_id).await?;
            }
            update.insert("doctor_id".to_string(), json!(doctor_id));
        }
        if let Some(datetime) = request.datetime {
            update.insert("datetime".to_string(), json!(datetime.to_rfc3339()));
        }
        if let Some(status) = request.status {
            if status != current.status {
                if !AppointmentLifecycleService::role_may_set(Role::Admin, status) {
                    return Err(AppointmentError::InvalidStatusTransition { from: current.status, to: status });
                }
                AppointmentLifecycleService::validate_status_transition(current.status, status)?;
            }
            update.insert("status".to_string(), json!(status));
        }
        if let Some(notes) = request.notes {
            update.insert("notes".to_string(), json!(notes));
        }

        self.patch_if_status(appointment_id, AppointmentScope::Any, current.status, update)
            .await?
            .ok_or(AppointmentError::ConcurrentModification)
    }

    pub async fn delete_appointment(
        &self,
        appointment_id: i64,
        scope: AppointmentScope,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Deleting appointment {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}{}", appointment_id, scope.filter());
        let rows: Vec<Value> = self.supabase.request(Method::DELETE, &path, None).await?;
        first_appointment(rows)?.ok_or(AppointmentError::NotFound)
    }

    /// Attach each appointment's doctor name and specialization. Two batched
    /// reads regardless of how many appointments are passed in.
    pub async fn with_doctors(
        &self,
        appointments: Vec<Appointment>,
    ) -> Result<Vec<AppointmentWithDoctor>, AppointmentError> {
        let doctor_ids: BTreeSet<i64> = appointments.iter().map(|a| a.doctor_id).collect();
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = doctor_ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        debug!("Loading doctor details for ({})", ids);

        let path = format!("/rest/v1/users?id=in.({})&select=id,full_name", ids);
        let names: Vec<DoctorName> = rows_as(self.supabase.request(Method::GET, &path, None).await?)?;

        let path = format!("/rest/v1/doctors?user_id=in.({})&select=user_id,specialization", ids);
        let profiles: Vec<DoctorSpecialization> = rows_as(self.supabase.request(Method::GET, &path, None).await?)?;

        let specializations: HashMap<i64, Option<String>> = profiles
            .into_iter()
            .map(|p| (p.user_id, p.specialization))
            .collect();
        let doctors: HashMap<i64, DoctorSummary> = names
            .into_iter()
            .map(|n| {
                let specialization = specializations.get(&n.id).cloned().flatten();
                (n.id, DoctorSummary { id: n.id, full_name: n.full_name, specialization })
            })
            .collect();

        Ok(appointments
            .into_iter()
            .map(|appointment| AppointmentWithDoctor {
                doctor: doctors.get(&appointment.doctor_id).cloned(),
                appointment,
            })
            .collect())
    }

    async fn patch_if_status(
        &self,
        appointment_id: i64,
        scope: AppointmentScope,
        expected: AppointmentStatus,
        mut update: Map<String, Value>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}{}",
            appointment_id,
            expected,
            scope.filter()
        );
        let rows: Vec<Value> = self.supabase
            .request(Method::PATCH, &path, Some(Value::Object(update)))
            .await?;

        first_appointment(rows)
    }
}
