use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Multipart, Path, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::DocumentRequest;
use crate::services::{DocumentService, FileStorageService};

fn document_not_found() -> AppError {
    AppError::NotFound("Document not found".to_string())
}

fn database_error(e: anyhow::Error) -> AppError {
    AppError::Database(e.to_string())
}

#[axum::debug_handler]
pub async fn create_document(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<DocumentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    request.validate().map_err(AppError::ValidationError)?;

    let service = DocumentService::new(&config);
    let document = service.create_document(user.id, request).await.map_err(database_error)?;

    Ok((StatusCode::CREATED, Json(json!({ "document": document }))))
}

#[axum::debug_handler]
pub async fn list_documents(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = DocumentService::new(&config);
    let documents = service.list_documents(user.id).await.map_err(database_error)?;

    Ok(Json(json!({ "documents": documents })))
}

#[axum::debug_handler]
pub async fn get_document(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(document_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = DocumentService::new(&config);
    let document = service.get_document(user.id, document_id)
        .await
        .map_err(database_error)?
        .ok_or_else(document_not_found)?;

    Ok(Json(json!({ "document": document })))
}

#[axum::debug_handler]
pub async fn update_document(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(document_id): Path<i64>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<Value>, AppError> {
    request.validate().map_err(AppError::ValidationError)?;

    let service = DocumentService::new(&config);
    let document = service.update_document(user.id, document_id, request)
        .await
        .map_err(database_error)?
        .ok_or_else(document_not_found)?;

    Ok(Json(json!({ "document": document })))
}

#[axum::debug_handler]
pub async fn delete_document(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(document_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = DocumentService::new(&config);
    let document = service.delete_document(user.id, document_id)
        .await
        .map_err(database_error)?
        .ok_or_else(document_not_found)?;

    Ok(Json(json!({
        "message": "Document deleted successfully",
        "document": document
    })))
}

#[axum::debug_handler]
pub async fn upload_file(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("file").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;

        let service = FileStorageService::new(&config);
        let uploaded = service.upload(user.id, &file_name, &content_type, bytes.to_vec())
            .await
            .map_err(|e| {
                warn!("Upload for user {} failed: {}", user.id, e);
                AppError::ExternalService(format!("Failed to upload file: {}", e))
            })?;

        return Ok(Json(json!(uploaded)));
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}
