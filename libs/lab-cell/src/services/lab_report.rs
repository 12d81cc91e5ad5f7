use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateLabReportRequest, LabReport, UpdateLabReportRequest};

/// Lab reports, always scoped to the technician who filed them.
pub struct LabReportService {
    supabase: SupabaseClient,
}

fn first_report(rows: Vec<Value>) -> Result<Option<LabReport>> {
    rows.into_iter()
        .next()
        .map(|row| serde_json::from_value(row).map_err(|e| anyhow!("Malformed lab report: {}", e)))
        .transpose()
}

impl LabReportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn scoped_path(technician_id: i64, report_id: i64) -> String {
        format!("/rest/v1/lab_reports?id=eq.{}&lab_technician_id=eq.{}", report_id, technician_id)
    }

    pub async fn create_report(&self, technician_id: i64, request: CreateLabReportRequest) -> Result<LabReport> {
        debug!("Technician {} filing {} for patient {}", technician_id, request.test_name, request.patient_id);

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "patient_id": request.patient_id,
            "lab_id": request.lab_id,
            "lab_technician_id": technician_id,
            "test_name": request.test_name,
            "test_date": request.test_date.to_rfc3339(),
            "result": request.result,
            "reference_range": request.reference_range,
            "interpretation": request.interpretation,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now
        });

        let rows: Vec<Value> = self.supabase
            .request(Method::POST, "/rest/v1/lab_reports", Some(body))
            .await?;

        let report = first_report(rows)?.ok_or_else(|| anyhow!("Lab report was not returned after insert"))?;
        info!("Lab report {} created", report.id);
        Ok(report)
    }

    pub async fn list_reports(&self, technician_id: i64) -> Result<Vec<LabReport>> {
        let path = format!("/rest/v1/lab_reports?lab_technician_id=eq.{}&order=test_date.desc", technician_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| anyhow!("Malformed lab report: {}", e)))
            .collect()
    }

    pub async fn get_report(&self, technician_id: i64, report_id: i64) -> Result<Option<LabReport>> {
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &Self::scoped_path(technician_id, report_id), None)
            .await?;
        first_report(rows)
    }

    pub async fn update_report(
        &self,
        technician_id: i64,
        report_id: i64,
        request: UpdateLabReportRequest,
    ) -> Result<Option<LabReport>> {
        let mut update = Map::new();

        if let Some(test_name) = request.test_name {
            update.insert("test_name".to_string(), json!(test_name));
        }
        if let Some(test_date) = request.test_date {
            update.insert("test_date".to_string(), json!(test_date.to_rfc3339()));
        }
        if let Some(result) = request.result {
            update.insert("result".to_string(), json!(result));
        }
        if let Some(reference_range) = request.reference_range {
            update.insert("reference_range".to_string(), json!(reference_range));
        }
        if let Some(interpretation) = request.interpretation {
            update.insert("interpretation".to_string(), json!(interpretation));
        }
        if let Some(notes) = request.notes {
            update.insert("notes".to_string(), json!(notes));
        }
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let rows: Vec<Value> = self.supabase
            .request(Method::PATCH, &Self::scoped_path(technician_id, report_id), Some(Value::Object(update)))
            .await?;
        first_report(rows)
    }

    pub async fn delete_report(&self, technician_id: i64, report_id: i64) -> Result<Option<LabReport>> {
        let rows: Vec<Value> = self.supabase
            .request(Method::DELETE, &Self::scoped_path(technician_id, report_id), None)
            .await?;
        first_report(rows)
    }
}
