use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::auth::Role;
use shared_models::error::AppError;

/// Row of the `users` table. The password hash is read from the store but
/// never serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub hashed_password: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserAccount {
    /// Name used when attributing work to this user in logs.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
    })
}

fn check_length(issues: &mut Vec<String>, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min || len > max {
        issues.push(format!("{} must be between {} and {} characters", field, min, max));
    }
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut issues = Vec::new();

        check_length(&mut issues, "username", &self.username, 3, 50);
        if !email_pattern().is_match(&self.email) {
            issues.push("email must be a valid email address".to_string());
        }
        check_length(&mut issues, "password", &self.password, 8, 100);
        if let Some(full_name) = &self.full_name {
            check_length(&mut issues, "full_name", full_name, 1, 100);
        }
        if let Some(phone) = &self.phone_number {
            check_length(&mut issues, "phone_number", phone, 10, 15);
        }
        if let Some(address) = &self.address {
            check_length(&mut issues, "address", address, 0, 200);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(issues))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserAccount,
}

/// Self-service profile update shared by the patient, doctor and lab routers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserListQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User already exists")]
    UserExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error("Invalid input: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Store returned no row")]
    EmptyResult,

    #[error(transparent)]
    Store(#[from] SupabaseError),

    #[error("Malformed user record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserExists => AppError::BadRequest(err.to_string()),
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::NotFound => AppError::NotFound(err.to_string()),
            AuthError::Validation(_) => AppError::ValidationError(err.to_string()),
            AuthError::Store(SupabaseError::Conflict(_)) => AppError::Conflict("User already exists".to_string()),
            AuthError::Store(e) => AppError::Database(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}
