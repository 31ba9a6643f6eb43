use std::sync::Arc;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

pub const TEST_AUTH_TOKEN: &str = "test-operator-token";

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub scheduling_service_url: String,
    pub default_duration_minutes: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            scheduling_service_url: "http://localhost:3000".to_string(),
            default_duration_minutes: 30,
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            scheduling_service_url: self.scheduling_service_url.clone(),
            default_duration_minutes: self.default_duration_minutes,
            server_port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned PostgREST rows for the tables the scheduling cell reads.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn booking_row(
        provider_id: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
        patient_name: &str,
        code: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "provider_id": provider_id,
            "patient_name": patient_name,
            "appointment_code": code,
            "appointment_date": date,
            "start_time": format!("{}:00", start_time),
            "end_time": format!("{}:00", end_time),
            "status": "scheduled"
        })
    }

    pub fn cancelled_booking_row(
        provider_id: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
    ) -> serde_json::Value {
        let mut row = Self::booking_row(provider_id, date, start_time, end_time, "Cancelled Patient", "APT-X");
        row["status"] = json!("cancelled");
        row
    }

    pub fn appointment_type_row(
        type_id: &str,
        duration_minutes: i64,
        buffer_before: i64,
        buffer_after: i64,
    ) -> serde_json::Value {
        json!({
            "id": type_id,
            "name": "Follow-up Visit",
            "duration_minutes": duration_minutes,
            "buffer_before_minutes": buffer_before,
            "buffer_after_minutes": buffer_after
        })
    }

    pub fn waitlist_row(patient_id: &str, provider_id: &str, date: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "provider_id": provider_id,
            "appointment_type_id": null,
            "preferred_date": date,
            "preferred_time_start": "09:00:00",
            "preferred_time_end": "09:30:00",
            "priority": "normal",
            "notes": null,
            "status": "waiting",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn directory_row(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "display_name": name
        })
    }

    pub fn error_response(message: &str) -> serde_json::Value {
        json!({
            "error": message
        })
    }
}
