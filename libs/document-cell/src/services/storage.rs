use anyhow::Result;
use chrono::Utc;
use tracing::info;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::UploadedFile;

pub struct FileStorageService {
    supabase: SupabaseClient,
    bucket: String,
}

/// Keep only the final path segment and replace anything outside
/// `[A-Za-z0-9._-]`, so the name is safe as a storage key and in a URL.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "file".to_string(),
        name => name.to_string(),
    }
}

impl FileStorageService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            bucket: config.storage_bucket.clone(),
        }
    }

    pub async fn upload(
        &self,
        user_id: i64,
        original_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile> {
        let file_name = format!("{}_{}", Utc::now().timestamp_millis(), sanitize_file_name(original_name));
        let object_path = format!("uploads/{}/{}", user_id, file_name);

        self.supabase
            .upload_object(&self.bucket, &object_path, bytes, content_type)
            .await?;

        info!("Stored {} in bucket {}", object_path, self.bucket);

        Ok(UploadedFile {
            message: "File uploaded successfully".to_string(),
            download_url: self.supabase.get_public_url(&self.bucket, &object_path),
            file_name,
        })
    }
}
