use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_utils::jwt::issue_token;

use crate::models::{AuthError, AuthResponse, SigninRequest, SignupRequest, UserAccount};
use crate::services::password::PasswordService;
use crate::services::user::{NewUser, UserService};

pub struct AuthService {
    users: UserService,
    jwt_secret: String,
    expiry_minutes: i64,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            users: UserService::new(config),
            jwt_secret: config.jwt_secret.clone(),
            expiry_minutes: config.jwt_expiry_minutes,
        }
    }

    fn token_for(&self, user: &UserAccount) -> Result<String, AuthError> {
        issue_token(user.id, Some(&user.email), user.role, &self.jwt_secret, self.expiry_minutes)
            .map_err(AuthError::Token)
    }

    /// Validate, hash and insert a new account. Used by signup and by
    /// administrators creating users directly.
    pub async fn create_account(&self, request: SignupRequest) -> Result<UserAccount, AuthError> {
        request.validate()?;
        debug!("Creating account: {}", request.username);

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let hashed_password = PasswordService::hash_password(&request.password)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        self.users.create_user(NewUser {
            username: request.username,
            email: request.email,
            hashed_password,
            full_name: request.full_name,
            role: request.role.unwrap_or_default(),
            date_of_birth: request.date_of_birth,
            phone_number: request.phone_number,
            address: request.address,
        }).await
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AuthError> {
        let user = self.create_account(request).await?;
        let token = self.token_for(&user)?;
        info!("User {} signed up", user.id);
        Ok(AuthResponse { token, user })
    }

    pub async fn signin(&self, request: SigninRequest) -> Result<AuthResponse, AuthError> {
        let user = self.users
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let valid = PasswordService::verify_password(&request.password, &user.hashed_password)
            .unwrap_or_else(|e| {
                warn!("Stored password hash for user {} is unreadable: {}", user.id, e);
                false
            });

        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.token_for(&user)?;
        debug!("User {} signed in", user.id);
        Ok(AuthResponse { token, user })
    }

    pub async fn me(&self, user_id: i64) -> Result<UserAccount, AuthError> {
        self.users.get_user(user_id).await?.ok_or(AuthError::NotFound)
    }
}
