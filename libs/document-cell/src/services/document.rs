use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Document, DocumentRequest};

/// Document metadata owned by a single user. Deleted documents stay in the
/// table flagged `is_deleted` and are invisible to every read.
pub struct DocumentService {
    supabase: SupabaseClient,
}

fn parse(row: Value) -> Result<Document> {
    serde_json::from_value(row).map_err(|e| anyhow!("Malformed document: {}", e))
}

fn first_document(rows: Vec<Value>) -> Result<Option<Document>> {
    rows.into_iter().next().map(parse).transpose()
}

impl DocumentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn live_path(user_id: i64, document_id: i64) -> String {
        format!(
            "/rest/v1/documents?id=eq.{}&user_id=eq.{}&is_deleted=eq.false",
            document_id, user_id
        )
    }

    pub async fn create_document(&self, user_id: i64, request: DocumentRequest) -> Result<Document> {
        debug!("Creating document {} for user {}", request.file_name, user_id);

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "user_id": user_id,
            "file_name": request.file_name,
            "file_type": request.file_type,
            "file_size": request.file_size,
            "description": request.description,
            "upload_date": now,
            "is_deleted": false,
            "created_at": now,
            "updated_at": now
        });

        let rows: Vec<Value> = self.supabase
            .request(Method::POST, "/rest/v1/documents", Some(body))
            .await?;

        first_document(rows)?.ok_or_else(|| anyhow!("Document was not returned after insert"))
    }

    pub async fn list_documents(&self, user_id: i64) -> Result<Vec<Document>> {
        let path = format!("/rest/v1/documents?user_id=eq.{}&is_deleted=eq.false&order=id.asc", user_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        rows.into_iter().map(parse).collect()
    }

    pub async fn get_document(&self, user_id: i64, document_id: i64) -> Result<Option<Document>> {
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &Self::live_path(user_id, document_id), None)
            .await?;
        first_document(rows)
    }

    pub async fn update_document(
        &self,
        user_id: i64,
        document_id: i64,
        request: DocumentRequest,
    ) -> Result<Option<Document>> {
        let body = json!({
            "file_name": request.file_name,
            "file_type": request.file_type,
            "file_size": request.file_size,
            "description": request.description,
            "updated_at": Utc::now().to_rfc3339()
        });

        let rows: Vec<Value> = self.supabase
            .request(Method::PATCH, &Self::live_path(user_id, document_id), Some(body))
            .await?;
        first_document(rows)
    }

    pub async fn delete_document(&self, user_id: i64, document_id: i64) -> Result<Option<Document>> {
        let body = json!({
            "is_deleted": true,
            "updated_at": Utc::now().to_rfc3339()
        });

        let rows: Vec<Value> = self.supabase
            .request(Method::PATCH, &Self::live_path(user_id, document_id), Some(body))
            .await?;

        let deleted = first_document(rows)?;
        if deleted.is_some() {
            info!("Document {} of user {} soft-deleted", document_id, user_id);
        }
        Ok(deleted)
    }
}
