use std::sync::Arc;
use chrono::{Duration, Utc};
use serde_json::json;

use shared_config::{AppConfig, ReconciliationConfig};
use shared_models::auth::{JwtClaims, Role, User};

use crate::jwt::sign_claims;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Point the store at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_expiry_minutes: 60,
            port: 3000,
            storage_bucket: "uploads".to_string(),
            attendance_default_count: 6,
            reconciliation: ReconciliationConfig {
                max_retries: 2,
                ..ReconciliationConfig::default()
            },
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(id: i64, role: Role) -> Self {
        Self {
            id,
            email: format!("{}-{}@example.com", role, id),
            role,
        }
    }

    pub fn doctor(id: i64) -> Self {
        Self::new(id, Role::Doctor)
    }

    pub fn patient(id: i64) -> Self {
        Self::new(id, Role::Patient)
    }

    pub fn lab_technician(id: i64) -> Self {
        Self::new(id, Role::LabTechnician)
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: Some(self.email.clone()),
            role: self.role,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = JwtClaims {
            sub: user.id.to_string(),
            exp: Some(exp.timestamp().max(0) as u64),
            email: Some(user.email.clone()),
            role: Some(user.role.to_string()),
            iat: Some(now.timestamp() as u64),
        };

        sign_claims(&claims, secret).expect("test secret is not empty")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row fixtures shaped like the PostgREST responses the cells parse.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_row(id: i64, role: &str) -> serde_json::Value {
        json!({
            "id": id,
            "username": format!("user{}", id),
            "email": format!("user{}@example.com", id),
            "hashed_password": "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g",
            "full_name": format!("User {}", id),
            "role": role,
            "date_of_birth": null,
            "phone_number": null,
            "address": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(id: i64, user_id: i64, doctor_id: i64, datetime: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": user_id,
            "doctor_id": doctor_id,
            "datetime": datetime,
            "status": status,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn attendance_row(id: i64, doctor_id: i64, date: &str, count: i32) -> serde_json::Value {
        json!({
            "id": id,
            "doctor_id": doctor_id,
            "date": date,
            "count": count,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_service_key, "test-service-key");
        assert!(app_config.is_configured());
        assert!(!app_config.reconciliation.enabled);
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor(3);
        assert_eq!(user.role, Role::Doctor);

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.id, 3);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::lab_technician(11);
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert_eq!(token.split('.').count(), 3);
        let validated = validate_token(&token, secret).unwrap();
        assert_eq!(validated.role, Role::LabTechnician);

        assert!(validate_token(&JwtTestUtils::create_expired_token(&user, secret), secret).is_err());
        assert!(validate_token(&JwtTestUtils::create_invalid_signature_token(&user), secret).is_err());
    }
}
