use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use auth_cell::UserService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Role;

use crate::models::{
    CreateDiagnosisRequest, CreatePrescriptionRequest, Diagnosis, DoctorError, Prescription,
    RecordFilter, UpdateDiagnosisRequest, UpdatePrescriptionRequest,
};

/// Row access for one clinical record table.
struct RecordTable {
    supabase: SupabaseClient,
    table: &'static str,
    label: &'static str,
}

impl RecordTable {
    fn path(&self, query: &str) -> String {
        format!("/rest/v1/{}?{}", self.table, query)
    }

    async fn insert<T: DeserializeOwned>(&self, mut body: Map<String, Value>) -> Result<T, DoctorError> {
        let now = json!(Utc::now().to_rfc3339());
        body.insert("created_at".to_string(), now.clone());
        body.insert("updated_at".to_string(), now);

        let rows: Vec<Value> = self.supabase
            .request(Method::POST, &format!("/rest/v1/{}", self.table), Some(Value::Object(body)))
            .await?;
        let row = rows.into_iter().next().ok_or(DoctorError::EmptyResult)?;
        Ok(serde_json::from_value(row)?)
    }

    async fn list<T: DeserializeOwned>(&self, filter: &RecordFilter) -> Result<Vec<T>, DoctorError> {
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &self.path(&filter.to_query()), None)
            .await?;
        Ok(rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?)
    }

    async fn one<T: DeserializeOwned>(&self, method: Method, id: i64, body: Option<Value>) -> Result<T, DoctorError> {
        let rows: Vec<Value> = self.supabase
            .request(method, &self.path(&format!("id=eq.{}", id)), body)
            .await?;
        let row = rows.into_iter().next().ok_or(DoctorError::NotFound(self.label))?;
        Ok(serde_json::from_value(row)?)
    }

    async fn get<T: DeserializeOwned>(&self, id: i64) -> Result<T, DoctorError> {
        self.one(Method::GET, id, None).await
    }

    async fn update<T: DeserializeOwned>(&self, id: i64, mut update: Map<String, Value>) -> Result<T, DoctorError> {
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        self.one(Method::PATCH, id, Some(Value::Object(update))).await
    }

    async fn delete<T: DeserializeOwned>(&self, id: i64) -> Result<T, DoctorError> {
        self.one(Method::DELETE, id, None).await
    }
}

fn require(field: &str, value: &str) -> Result<(), DoctorError> {
    if value.trim().is_empty() {
        return Err(DoctorError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn insert_some<T: serde::Serialize>(update: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        update.insert(key.to_string(), json!(value));
    }
}

async fn ensure_patient(users: &UserService, patient_id: i64) -> Result<(), DoctorError> {
    match users.get_user(patient_id).await? {
        Some(user) if user.role == Role::Patient => Ok(()),
        _ => Err(DoctorError::PatientNotFound),
    }
}

pub struct DiagnosisService {
    table: RecordTable,
    users: UserService,
}

impl DiagnosisService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            table: RecordTable {
                supabase: SupabaseClient::new(config),
                table: "diagnoses",
                label: "Diagnosis",
            },
            users: UserService::new(config),
        }
    }

    pub async fn create(&self, doctor_id: i64, request: CreateDiagnosisRequest) -> Result<Diagnosis, DoctorError> {
        require("diagnosis", &request.diagnosis)?;
        ensure_patient(&self.users, request.patient_id).await?;

        let mut body = Map::new();
        body.insert("patient_id".to_string(), json!(request.patient_id));
        body.insert("doctor_id".to_string(), json!(doctor_id));
        body.insert("diagnosis".to_string(), json!(request.diagnosis));
        body.insert("date".to_string(), json!(request.date.to_rfc3339()));
        insert_some(&mut body, "notes", request.notes);

        let diagnosis: Diagnosis = self.table.insert(body).await?;
        info!("Doctor {} recorded diagnosis {} for patient {}", doctor_id, diagnosis.id, diagnosis.patient_id);
        Ok(diagnosis)
    }

    pub async fn list(&self, filter: &RecordFilter) -> Result<Vec<Diagnosis>, DoctorError> {
        debug!("Listing diagnoses ({:?})", filter);
        self.table.list(filter).await
    }

    pub async fn get(&self, id: i64) -> Result<Diagnosis, DoctorError> {
        self.table.get(id).await
    }

    pub async fn update(&self, id: i64, request: UpdateDiagnosisRequest) -> Result<Diagnosis, DoctorError> {
        let mut update = Map::new();
        if let Some(diagnosis) = &request.diagnosis {
            require("diagnosis", diagnosis)?;
        }
        insert_some(&mut update, "diagnosis", request.diagnosis);
        insert_some(&mut update, "date", request.date.map(|d| d.to_rfc3339()));
        insert_some(&mut update, "notes", request.notes);

        self.table.update(id, update).await
    }

    pub async fn delete(&self, id: i64) -> Result<Diagnosis, DoctorError> {
        self.table.delete(id).await
    }
}

pub struct PrescriptionService {
    table: RecordTable,
    users: UserService,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            table: RecordTable {
                supabase: SupabaseClient::new(config),
                table: "prescriptions",
                label: "Prescription",
            },
            users: UserService::new(config),
        }
    }

    pub async fn create(
        &self,
        doctor_id: i64,
        request: CreatePrescriptionRequest,
    ) -> Result<Prescription, DoctorError> {
        require("medication", &request.medication)?;
        require("dosage", &request.dosage)?;
        require("frequency", &request.frequency)?;
        if matches!(request.end_date, Some(end) if end < request.start_date) {
            return Err(DoctorError::Validation("end_date must not precede start_date".to_string()));
        }
        ensure_patient(&self.users, request.patient_id).await?;

        let mut body = Map::new();
        body.insert("patient_id".to_string(), json!(request.patient_id));
        body.insert("doctor_id".to_string(), json!(doctor_id));
        body.insert("medication".to_string(), json!(request.medication));
        body.insert("dosage".to_string(), json!(request.dosage));
        body.insert("frequency".to_string(), json!(request.frequency));
        body.insert("start_date".to_string(), json!(request.start_date.to_rfc3339()));
        insert_some(&mut body, "end_date", request.end_date.map(|d| d.to_rfc3339()));
        insert_some(&mut body, "notes", request.notes);

        let prescription: Prescription = self.table.insert(body).await?;
        info!("Doctor {} prescribed {} to patient {}", doctor_id, prescription.medication, prescription.patient_id);
        Ok(prescription)
    }

    pub async fn list(&self, filter: &RecordFilter) -> Result<Vec<Prescription>, DoctorError> {
        debug!("Listing prescriptions ({:?})", filter);
        self.table.list(filter).await
    }

    pub async fn get(&self, id: i64) -> Result<Prescription, DoctorError> {
        self.table.get(id).await
    }

    pub async fn update(&self, id: i64, request: UpdatePrescriptionRequest) -> Result<Prescription, DoctorError> {
        for (field, value) in [
            ("medication", &request.medication),
            ("dosage", &request.dosage),
            ("frequency", &request.frequency),
        ] {
            if let Some(value) = value {
                require(field, value)?;
            }
        }

        let mut update = Map::new();
        insert_some(&mut update, "medication", request.medication);
        insert_some(&mut update, "dosage", request.dosage);
        insert_some(&mut update, "frequency", request.frequency);
        insert_some(&mut update, "start_date", request.start_date.map(|d| d.to_rfc3339()));
        insert_some(&mut update, "end_date", request.end_date.map(|d| d.to_rfc3339()));
        insert_some(&mut update, "notes", request.notes);

        self.table.update(id, update).await
    }

    pub async fn delete(&self, id: i64) -> Result<Prescription, DoctorError> {
        self.table.delete(id).await
    }
}
