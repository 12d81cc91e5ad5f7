use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::{encode, SupabaseClient};
use shared_models::auth::Role;

use crate::models::{AdminUpdateUserRequest, AuthError, UpdateProfileRequest, UserAccount};

/// Fields needed to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

pub struct UserService {
    supabase: SupabaseClient,
}

fn first_user(rows: Vec<Value>) -> Result<Option<UserAccount>, AuthError> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

impl UserService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<UserAccount>, AuthError> {
        debug!("Fetching user: {}", user_id);

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        first_user(rows)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AuthError> {
        debug!("Looking up user by email");

        let path = format!("/rest/v1/users?email=eq.{}", encode(email));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        first_user(rows)
    }

    pub async fn list_users(&self, skip: u32, limit: u32) -> Result<Vec<UserAccount>, AuthError> {
        debug!("Listing users (skip {}, limit {})", skip, limit);

        let path = format!("/rest/v1/users?order=id.asc&offset={}&limit={}", skip, limit);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<UserAccount>, _>>()?)
    }

    pub async fn create_user(&self, user: NewUser) -> Result<UserAccount, AuthError> {
        debug!("Creating user: {}", user.username);

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "username": user.username,
            "email": user.email,
            "hashed_password": user.hashed_password,
            "full_name": user.full_name,
            "role": user.role,
            "date_of_birth": user.date_of_birth,
            "phone_number": user.phone_number,
            "address": user.address,
            "created_at": now,
            "updated_at": now
        });

        let rows: Vec<Value> = self.supabase
            .request(Method::POST, "/rest/v1/users", Some(body))
            .await?;

        let created = first_user(rows)?.ok_or(AuthError::EmptyResult)?;
        info!("User {} created with role {}", created.id, created.role);
        Ok(created)
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        request: UpdateProfileRequest,
    ) -> Result<UserAccount, AuthError> {
        let mut update = Map::new();

        if let Some(full_name) = request.full_name {
            update.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update.insert("date_of_birth".to_string(), json!(date_of_birth));
        }
        if let Some(phone_number) = request.phone_number {
            update.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(address) = request.address {
            update.insert("address".to_string(), json!(address));
        }

        self.patch_user(user_id, update).await
    }

    pub async fn admin_update(
        &self,
        user_id: i64,
        request: AdminUpdateUserRequest,
    ) -> Result<UserAccount, AuthError> {
        let mut update = Map::new();

        if let Some(full_name) = request.full_name {
            update.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(email) = request.email {
            update.insert("email".to_string(), json!(email));
        }
        if let Some(role) = request.role {
            update.insert("role".to_string(), json!(role));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update.insert("date_of_birth".to_string(), json!(date_of_birth));
        }
        if let Some(phone_number) = request.phone_number {
            update.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(address) = request.address {
            update.insert("address".to_string(), json!(address));
        }

        self.patch_user(user_id, update).await
    }

    pub async fn set_role(&self, user_id: i64, role: Role) -> Result<UserAccount, AuthError> {
        let mut update = Map::new();
        update.insert("role".to_string(), json!(role));
        self.patch_user(user_id, update).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<UserAccount, AuthError> {
        debug!("Deleting user: {}", user_id);

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let rows: Vec<Value> = self.supabase.request(Method::DELETE, &path, None).await?;
        first_user(rows)?.ok_or(AuthError::NotFound)
    }

    async fn patch_user(&self, user_id: i64, mut update: Map<String, Value>) -> Result<UserAccount, AuthError> {
        debug!("Updating user {} ({} fields)", user_id, update.len());

        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let rows: Vec<Value> = self.supabase
            .request(Method::PATCH, &path, Some(Value::Object(update)))
            .await?;

        first_user(rows)?.ok_or(AuthError::NotFound)
    }
}
