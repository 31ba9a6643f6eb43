use std::env;
use tracing::warn;

pub const DEFAULT_APPOINTMENT_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Base URL of the Scheduling Service, used by the client-side workflow.
    pub scheduling_service_url: String,
    pub default_duration_minutes: i64,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            scheduling_service_url: env::var("SCHEDULING_SERVICE_URL")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULING_SERVICE_URL not set, using default");
                    format!("http://localhost:{}", DEFAULT_SERVER_PORT)
                }),
            default_duration_minutes: parse_or_default(
                "DEFAULT_APPOINTMENT_DURATION_MINUTES",
                DEFAULT_APPOINTMENT_DURATION_MINUTES,
            ),
            server_port: parse_or_default("SERVER_PORT", DEFAULT_SERVER_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
