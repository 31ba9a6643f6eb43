// libs/recurring-appointment-cell/src/services/store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{ExistingBooking, NewAppointment};

const BOOKING_COLUMNS: &str =
    "id,provider_id,patient_name,appointment_code,appointment_date,start_time,end_time,status";

/// Read access to a provider's existing bookings.
#[async_trait]
pub trait BookingSource: Send + Sync {
    /// All bookings of `provider_id` dated within `from..=to`.
    async fn bookings_in_range(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingBooking>>;
}

/// Bookings plus the ability to persist a whole series at once.
#[async_trait]
pub trait AppointmentStore: BookingSource {
    /// Store every row or none of them. Returns the new appointment ids in
    /// insertion order.
    async fn insert_series(&self, rows: &[NewAppointment]) -> Result<Vec<Uuid>>;
}

/// PostgREST-backed appointment storage scoped to one caller's token.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self { supabase, auth_token }
    }
}

#[async_trait]
impl BookingSource for SupabaseAppointmentStore {
    async fn bookings_in_range(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingBooking>> {
        debug!("Loading bookings for provider {} from {} to {}", provider_id, from, to);

        let query_parts = [
            format!("select={}", BOOKING_COLUMNS),
            format!("provider_id=eq.{}", provider_id),
            format!("appointment_date=gte.{}", from.format("%Y-%m-%d")),
            format!("appointment_date=lte.{}", to.format("%Y-%m-%d")),
        ];

        let path = format!(
            "/rest/v1/appointments?{}&order=appointment_date.asc,start_time.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            self.auth_token.as_deref(),
            None,
        ).await.map_err(|e| RecurringAppointmentError::Database(e.to_string()))?;

        let bookings = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<ExistingBooking>, _>>()
            .map_err(|e| RecurringAppointmentError::Database(format!("Failed to parse bookings: {}", e)))?;

        debug!("Found {} bookings for provider {}", bookings.len(), provider_id);
        Ok(bookings)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert_series(&self, rows: &[NewAppointment]) -> Result<Vec<Uuid>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::to_value(rows)
            .map_err(|e| RecurringAppointmentError::Database(format!("Failed to encode appointments: {}", e)))?;

        let stored = self.supabase
            .insert_returning("appointments", body, self.auth_token.as_deref())
            .await
            .map_err(|e| RecurringAppointmentError::Database(e.to_string()))?;

        let ids = stored.iter()
            .map(|row| {
                row.get("id")
                    .and_then(Value::as_str)
                    .and_then(|id| Uuid::parse_str(id).ok())
                    .ok_or_else(|| RecurringAppointmentError::Database(
                        "Stored appointment row is missing its id".to_string(),
                    ))
            })
            .collect::<Result<Vec<Uuid>>>()?;

        if ids.len() != rows.len() {
            return Err(RecurringAppointmentError::Database(format!(
                "Expected {} stored appointments, storage returned {}",
                rows.len(),
                ids.len()
            )));
        }

        info!("Stored {} appointments in one batch", ids.len());
        Ok(ids)
    }
}
