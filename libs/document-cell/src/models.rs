use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub file_name: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub upload_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for both creating and replacing a document's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub file_name: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub description: Option<String>,
}

impl DocumentRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.file_name.trim().is_empty() {
            return Err("file_name is required".to_string());
        }
        if matches!(self.file_size, Some(size) if size < 0) {
            return Err("file_size cannot be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedFile {
    pub message: String,
    pub file_name: String,
    pub download_url: String,
}
