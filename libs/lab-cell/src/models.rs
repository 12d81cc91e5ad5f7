use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabReport {
    pub id: i64,
    pub lab_id: Option<i64>,
    pub patient_id: i64,
    pub lab_technician_id: i64,
    pub test_name: String,
    pub test_date: DateTime<Utc>,
    pub result: String,
    pub reference_range: Option<String>,
    pub interpretation: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLabReportRequest {
    pub patient_id: i64,
    pub lab_id: Option<i64>,
    pub test_name: String,
    pub test_date: DateTime<Utc>,
    pub result: String,
    pub reference_range: Option<String>,
    pub interpretation: Option<String>,
    pub notes: Option<String>,
}

impl CreateLabReportRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.test_name.trim().is_empty() {
            return Err("test_name is required".to_string());
        }
        if self.result.trim().is_empty() {
            return Err("result is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLabReportRequest {
    pub test_name: Option<String>,
    pub test_date: Option<DateTime<Utc>>,
    pub result: Option<String>,
    pub reference_range: Option<String>,
    pub interpretation: Option<String>,
    pub notes: Option<String>,
}
