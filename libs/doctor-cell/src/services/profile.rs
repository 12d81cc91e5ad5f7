use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use auth_cell::{AuthError, UserAccount, UserService};
use shared_config::AppConfig;
use shared_database::supabase::{encode, SupabaseClient};
use shared_database::SupabaseError;
use shared_models::auth::Role;

use crate::models::{ChangeToDoctorRequest, DoctorError, DoctorProfile};

/// A user freshly promoted to doctor together with the profile created for
/// them.
#[derive(Debug, Clone, Serialize)]
pub struct PromotedDoctor {
    pub user: UserAccount,
    pub doctor_profile: DoctorProfile,
}

pub struct DoctorProfileService {
    supabase: SupabaseClient,
    users: UserService,
}

fn first_profile(rows: Vec<Value>) -> Result<Option<DoctorProfile>, DoctorError> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

impl DoctorProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            users: UserService::new(config),
        }
    }

    pub async fn get_for_user(&self, user_id: i64) -> Result<Option<DoctorProfile>, DoctorError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        first_profile(rows)
    }

    async fn create_profile(
        &self,
        user_id: i64,
        specialization: &str,
        license_number: &str,
        years_of_experience: Option<i32>,
    ) -> Result<DoctorProfile, DoctorError> {
        let path = format!("/rest/v1/doctors?license_number=eq.{}", encode(license_number));
        let existing: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        if !existing.is_empty() {
            return Err(DoctorError::LicenseInUse);
        }

        let body = json!({
            "user_id": user_id,
            "specialization": specialization,
            "license_number": license_number,
            "years_of_experience": years_of_experience
        });

        let rows: Vec<Value> = match self.supabase.request(Method::POST, "/rest/v1/doctors", Some(body)).await {
            Ok(rows) => rows,
            Err(SupabaseError::Conflict(_)) => return Err(DoctorError::LicenseInUse),
            Err(e) => return Err(e.into()),
        };

        first_profile(rows)?.ok_or(DoctorError::EmptyResult)
    }

    /// Give a user the doctor role and create their profile. The role change
    /// is reverted when the profile cannot be created.
    pub async fn promote(&self, user_id: i64, request: ChangeToDoctorRequest) -> Result<PromotedDoctor, DoctorError> {
        let (specialization, license_number) = request.validate()?;
        debug!("Promoting user {} to doctor", user_id);

        let previous = self.users
            .get_user(user_id)
            .await?
            .ok_or(DoctorError::NotFound("User"))?;

        if let Some(profile) = self.get_for_user(user_id).await? {
            warn!("User {} already has doctor profile {}", user_id, profile.id);
            return Err(DoctorError::Validation("User already has a doctor profile".to_string()));
        }

        let user = match self.users.set_role(user_id, Role::Doctor).await {
            Ok(user) => user,
            Err(AuthError::NotFound) => return Err(DoctorError::NotFound("User")),
            Err(e) => return Err(e.into()),
        };

        match self.create_profile(user_id, specialization, license_number, request.years_of_experience).await {
            Ok(doctor_profile) => {
                info!("User {} is now a doctor (profile {})", user_id, doctor_profile.id);
                Ok(PromotedDoctor { user, doctor_profile })
            }
            Err(e) => {
                if let Err(revert) = self.users.set_role(user_id, previous.role).await {
                    error!("Failed to restore role {} for user {}: {}", previous.role, user_id, revert);
                }
                Err(e)
            }
        }
    }
}
