use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_ATTENDANCE_COUNT: i32 = 6;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    pub port: u16,
    pub storage_bucket: String,
    pub attendance_default_count: i32,
    pub reconciliation: ReconciliationConfig,
}

/// Switches for the attendance reconciliation job. Disabled unless
/// `RECONCILIATION_ENABLED` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 600,
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

impl ReconciliationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = ReconciliationConfig::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            jwt_expiry_minutes: parsed_or("JWT_EXPIRY_MINUTES", 60 * 24),
            port: parsed_or("PORT", 3000),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| {
                    warn!("STORAGE_BUCKET not set, using default");
                    "uploads".to_string()
                }),
            attendance_default_count: parsed_or("ATTENDANCE_DEFAULT_COUNT", DEFAULT_ATTENDANCE_COUNT),
            reconciliation: ReconciliationConfig {
                enabled: flag("RECONCILIATION_ENABLED"),
                interval_secs: parsed_or("RECONCILIATION_INTERVAL_SECS", defaults.interval_secs),
                timeout_secs: parsed_or("RECONCILIATION_TIMEOUT_SECS", defaults.timeout_secs),
                max_retries: parsed_or("RECONCILIATION_MAX_RETRIES", defaults.max_retries),
            },
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconciliation_is_disabled_by_default() {
        let config = ReconciliationConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.interval(), Duration::from_secs(600));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = ReconciliationConfig { interval_secs: 0, timeout_secs: 0, ..Default::default() };
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
