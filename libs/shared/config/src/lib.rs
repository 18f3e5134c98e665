use std::env;
use tracing::warn;

/// How far in the past an appointment must be before it becomes eligible
/// for automatic no-show evaluation.
pub const NO_SHOW_LOOKBACK_HOURS: i64 = 24;

/// Upper bound on a single reconciliation run. A run that exceeds this is
/// abandoned so the next scheduled tick is not blocked behind it.
pub const RUN_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub worker_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            worker_port: env::var("WORKER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_role_key.is_empty()
    }
}
