// libs/recurring-appointment-cell/src/services/waitlist.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_utils::time_format::format_time;

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{WaitlistEntry, WaitlistPriority, WaitlistRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedWaitlist {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub appointment_type_id: Option<Uuid>,
    pub preferred_date: NaiveDate,
    pub preferred_time_start: NaiveTime,
    pub preferred_time_end: NaiveTime,
    pub priority: WaitlistPriority,
    pub notes: Option<String>,
}

pub fn validate_waitlist_request(request: &WaitlistRequest, today: NaiveDate) -> Result<ValidatedWaitlist> {
    let mut missing = Vec::new();
    if request.patient_id.is_none() {
        missing.push("patientId");
    }
    if request.provider_id.is_none() {
        missing.push("providerId");
    }
    if request.preferred_date.is_none() {
        missing.push("preferredDate");
    }
    if request.preferred_time_start.is_none() {
        missing.push("preferredTimeStart");
    }
    if request.preferred_time_end.is_none() {
        missing.push("preferredTimeEnd");
    }

    let (Some(patient_id), Some(provider_id), Some(preferred_date), Some(start), Some(end)) = (
        request.patient_id,
        request.provider_id,
        request.preferred_date,
        request.preferred_time_start,
        request.preferred_time_end,
    ) else {
        return Err(RecurringAppointmentError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    };

    if start >= end {
        return Err(RecurringAppointmentError::validation(
            "preferredTimeStart must be before preferredTimeEnd",
        ));
    }

    if preferred_date < today {
        return Err(RecurringAppointmentError::Validation(format!(
            "preferredDate {} is in the past",
            preferred_date
        )));
    }

    Ok(ValidatedWaitlist {
        patient_id,
        provider_id,
        appointment_type_id: request.appointment_type_id,
        preferred_date,
        preferred_time_start: start,
        preferred_time_end: end,
        priority: request.priority,
        notes: request.notes.clone().filter(|n| !n.trim().is_empty()),
    })
}

/// Stores waitlist entries for instances that could not be scheduled.
pub struct WaitlistService {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl WaitlistService {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self { supabase, auth_token }
    }

    pub async fn add(&self, request: &WaitlistRequest, today: NaiveDate) -> Result<WaitlistEntry> {
        let entry = validate_waitlist_request(request, today)?;
        debug!("Adding patient {} to waitlist of provider {}", entry.patient_id, entry.provider_id);

        let row = json!({
            "patient_id": entry.patient_id,
            "provider_id": entry.provider_id,
            "appointment_type_id": entry.appointment_type_id,
            "preferred_date": entry.preferred_date.format("%Y-%m-%d").to_string(),
            "preferred_time_start": format_time(&entry.preferred_time_start),
            "preferred_time_end": format_time(&entry.preferred_time_end),
            "priority": entry.priority,
            "notes": entry.notes,
            "status": "waiting"
        });

        let stored = self.supabase
            .insert_returning("waitlist_entries", row, self.auth_token.as_deref())
            .await
            .map_err(|e| RecurringAppointmentError::Database(e.to_string()))?;

        let stored = stored.into_iter().next()
            .ok_or_else(|| RecurringAppointmentError::Database("Waitlist insert returned no row".to_string()))?;

        let created: WaitlistEntry = serde_json::from_value(stored)
            .map_err(|e| RecurringAppointmentError::Database(format!("Failed to parse waitlist entry: {}", e)))?;

        info!("Waitlist entry {} created for {}", created.id, created.preferred_date);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn request() -> WaitlistRequest {
        WaitlistRequest {
            patient_id: Some(Uuid::new_v4()),
            provider_id: Some(Uuid::new_v4()),
            preferred_date: Some(date(8)),
            preferred_time_start: Some(time(9, 0)),
            preferred_time_end: Some(time(9, 30)),
            priority: WaitlistPriority::High,
            notes: Some("  ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request() {
        let validated = validate_waitlist_request(&request(), date(1)).unwrap();
        assert_eq!(validated.priority, WaitlistPriority::High);
        assert_eq!(validated.notes, None);
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let request = WaitlistRequest { patient_id: None, preferred_date: None, ..request() };
        assert_matches!(
            validate_waitlist_request(&request, date(1)),
            Err(RecurringAppointmentError::Validation(msg)) if msg == "Missing required fields: patientId, preferredDate"
        );
    }

    #[test]
    fn test_inverted_window_and_past_date_rejected() {
        let request_inverted = WaitlistRequest {
            preferred_time_end: Some(time(9, 0)),
            ..request()
        };
        assert!(validate_waitlist_request(&request_inverted, date(1)).is_err());
        assert!(validate_waitlist_request(&request(), date(9)).is_err());
    }
}
