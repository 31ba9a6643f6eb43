// libs/recurring-appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};
use std::fmt;

use shared_utils::time_format::{hhmm, hhmm_option};

use crate::error::{RecurringAppointmentError, Result};

/// Hard ceiling on generated occurrences for one series.
pub const MAX_OCCURRENCES: u32 = 100;

/// Longest duration or buffer, in minutes, a slot may carry.
pub const MAX_SLOT_MINUTES: i64 = 24 * 60;

// ==============================================================================
// RECURRENCE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    #[serde(alias = "WEEKLY", alias = "Weekly")]
    Weekly,
    #[serde(alias = "MONTHLY", alias = "Monthly")]
    Monthly,
    #[serde(alias = "QUARTERLY", alias = "Quarterly")]
    Quarterly,
}

impl Frequency {
    /// Days per unit. Months and quarters are fixed approximations, not
    /// calendar arithmetic; previews downstream rely on this stepping.
    pub fn unit_days(&self) -> i64 {
        match self {
            Frequency::Weekly => 7,
            Frequency::Monthly => 30,
            Frequency::Quarterly => 90,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Quarterly => write!(f, "quarterly"),
        }
    }
}

/// Recurrence form as it travels over the wire.
///
/// Fields that validation reports on are optional so that a missing value
/// surfaces as a validation error instead of a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecurrenceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_type_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(with = "hhmm_option", skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_day_of_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_appointments: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Validated, immutable recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    pub interval_count: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub preferred_time: NaiveTime,
    /// Informational only; expansion does not snap to this weekday.
    pub preferred_day_of_week: Option<u8>,
    pub total_occurrences: Option<u32>,
}

impl RecurrenceSpec {
    pub fn step_days(&self) -> i64 {
        i64::from(self.interval_count.max(1)) * self.frequency.unit_days()
    }

    /// Fails when neither bound is present.
    pub fn ensure_bounded(&self) -> Result<()> {
        if self.end_date.is_none() && self.total_occurrences.is_none() {
            return Err(RecurringAppointmentError::validation(
                "Either endDate or totalAppointments is required",
            ));
        }
        Ok(())
    }

    pub fn occurrence_cap(&self) -> usize {
        self.total_occurrences
            .map(|n| n.clamp(1, MAX_OCCURRENCES))
            .unwrap_or(MAX_OCCURRENCES) as usize
    }
}

/// Identity fields plus the rule, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecurrence {
    pub provider_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub appointment_type_id: Option<Uuid>,
    pub spec: RecurrenceSpec,
}

impl RecurrenceRequest {
    /// Check required fields and normalize the rule. `today` is passed in so
    /// the check stays deterministic.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidatedRecurrence> {
        let mut missing = Vec::new();
        if self.provider_id.is_none() {
            missing.push("providerId");
        }
        if self.start_date.is_none() {
            missing.push("startDate");
        }
        if self.preferred_time.is_none() {
            missing.push("preferredTime");
        }
        if self.end_date.is_none() && self.total_appointments.is_none() {
            missing.push("endDate or totalAppointments");
        }
        if !missing.is_empty() {
            return Err(RecurringAppointmentError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let (Some(provider_id), Some(start_date), Some(preferred_time)) =
            (self.provider_id, self.start_date, self.preferred_time)
        else {
            return Err(RecurringAppointmentError::validation("Missing required fields"));
        };

        if start_date < today {
            return Err(RecurringAppointmentError::Validation(format!(
                "startDate {} is in the past",
                start_date
            )));
        }

        if let Some(end_date) = self.end_date {
            if end_date <= start_date {
                return Err(RecurringAppointmentError::validation(
                    "endDate must be after startDate",
                ));
            }
        }

        if let Some(day) = self.preferred_day_of_week {
            if day > 6 {
                return Err(RecurringAppointmentError::validation(
                    "preferredDayOfWeek must be between 0 (Sunday) and 6 (Saturday)",
                ));
            }
        }

        let interval_count = self.frequency_value
            .filter(|v| *v > 0)
            .map(|v| v.min(i64::from(u32::MAX)) as u32)
            .unwrap_or(1);

        let total_occurrences = self.total_appointments
            .map(|n| n.clamp(1, i64::from(MAX_OCCURRENCES)) as u32);

        Ok(ValidatedRecurrence {
            provider_id,
            patient_id: self.patient_id,
            appointment_type_id: self.appointment_type_id,
            spec: RecurrenceSpec {
                frequency: self.frequency.unwrap_or_default(),
                interval_count,
                start_date,
                end_date: self.end_date,
                preferred_time,
                preferred_day_of_week: self.preferred_day_of_week,
                total_occurrences,
            },
        })
    }
}

// ==============================================================================
// INSTANCE & CONFLICT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInstance {
    #[serde(rename = "appointmentNumber")]
    pub sequence_number: u32,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingAppointment {
    pub patient_name: String,
    pub appointment_code: String,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub has_conflict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_reason: Option<String>,
    #[serde(default)]
    pub conflicting_appointments: Vec<ConflictingAppointment>,
}

impl ConflictInfo {
    pub fn none() -> Self {
        Self::default()
    }
}

/// One row of the preview table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviewAppointment {
    #[serde(flatten)]
    pub instance: AppointmentInstance,
    #[serde(flatten)]
    pub conflict: ConflictInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub total_count: usize,
    pub available_count: usize,
    pub conflict_count: usize,
    pub preview_appointments: Vec<PreviewAppointment>,
}

impl PreviewResult {
    /// Counts are derived from the rows, so `total == available + conflict`.
    pub fn from_rows(preview_appointments: Vec<PreviewAppointment>) -> Self {
        let conflict_count = preview_appointments
            .iter()
            .filter(|row| row.conflict.has_conflict)
            .count();
        let total_count = preview_appointments.len();
        Self {
            total_count,
            available_count: total_count - conflict_count,
            conflict_count,
            preview_appointments,
        }
    }

    pub fn find(&self, appointment_number: u32) -> Option<&PreviewAppointment> {
        self.preview_appointments
            .iter()
            .find(|row| row.instance.sequence_number == appointment_number)
    }
}

// ==============================================================================
// STORAGE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    /// Any status this service does not know. Treated as occupying the slot.
    #[serde(other)]
    Unknown,
}

impl BookingStatus {
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }
}

/// An appointment already stored for a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExistingBooking {
    pub id: Uuid,
    pub provider_id: Uuid,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub appointment_code: String,
    #[serde(rename = "appointment_date")]
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferWindow {
    pub before_minutes: i64,
    pub after_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentTypeProfile {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub buffer_before_minutes: i64,
    #[serde(default)]
    pub buffer_after_minutes: i64,
}

impl AppointmentTypeProfile {
    pub fn buffers(&self) -> BufferWindow {
        BufferWindow {
            before_minutes: self.buffer_before_minutes.clamp(0, MAX_SLOT_MINUTES),
            after_minutes: self.buffer_after_minutes.clamp(0, MAX_SLOT_MINUTES),
        }
    }

    /// Duration and buffers of this type. Stored values outside one day are
    /// reported as a storage error.
    pub fn slot_timing(&self) -> Result<SlotTiming> {
        let fields = [
            ("duration_minutes", self.duration_minutes),
            ("buffer_before_minutes", self.buffer_before_minutes),
            ("buffer_after_minutes", self.buffer_after_minutes),
        ];
        if let Some((field, value)) = fields.iter().find(|(_, v)| *v > MAX_SLOT_MINUTES) {
            return Err(RecurringAppointmentError::Database(format!(
                "Appointment type {} has {} = {}, above {} minutes",
                self.id, field, value, MAX_SLOT_MINUTES
            )));
        }

        Ok(SlotTiming {
            duration_minutes: self.duration_minutes,
            buffers: self.buffers(),
        })
    }
}

/// Duration and buffers applied to every slot of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTiming {
    pub duration_minutes: i64,
    pub buffers: BufferWindow,
}

/// Row inserted for every scheduled occurrence of a series.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewAppointment {
    pub series_id: Uuid,
    pub sequence_number: u32,
    pub provider_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub appointment_type_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
    pub status: BookingStatus,
    pub is_rescheduled: bool,
    pub notes: Option<String>,
}

// ==============================================================================
// OVERRIDE MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reschedule {
    pub custom_date: NaiveDate,
    pub custom_start_time: NaiveTime,
    pub custom_end_time: NaiveTime,
}

impl Reschedule {
    pub fn new(
        custom_date: NaiveDate,
        custom_start_time: NaiveTime,
        custom_end_time: NaiveTime,
    ) -> Result<Self> {
        if custom_end_time <= custom_start_time {
            return Err(RecurringAppointmentError::validation(
                "customEndTime must be after customStartTime",
            ));
        }
        Ok(Self {
            custom_date,
            custom_start_time,
            custom_end_time,
        })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.custom_end_time - self.custom_start_time).num_minutes()
    }
}

/// Operator decision for one instance. Exactly one kind applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideAction {
    Skip,
    Reschedule(Reschedule),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOverride {
    pub appointment_number: u32,
    pub action: OverrideAction,
}

/// Wire shape of an override: `{appointmentNumber, skip: true}` or
/// `{appointmentNumber, customDate, customStartTime, customEndTime}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentOverride {
    pub appointment_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_date: Option<NaiveDate>,
    #[serde(default, with = "hhmm_option", skip_serializing_if = "Option::is_none")]
    pub custom_start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_option", skip_serializing_if = "Option::is_none")]
    pub custom_end_time: Option<NaiveTime>,
}

impl From<&InstanceOverride> for AppointmentOverride {
    fn from(value: &InstanceOverride) -> Self {
        match &value.action {
            OverrideAction::Skip => AppointmentOverride {
                appointment_number: value.appointment_number,
                skip: Some(true),
                ..Default::default()
            },
            OverrideAction::Reschedule(r) => AppointmentOverride {
                appointment_number: value.appointment_number,
                skip: None,
                custom_date: Some(r.custom_date),
                custom_start_time: Some(r.custom_start_time),
                custom_end_time: Some(r.custom_end_time),
            },
        }
    }
}

impl TryFrom<AppointmentOverride> for InstanceOverride {
    type Error = RecurringAppointmentError;

    fn try_from(value: AppointmentOverride) -> Result<Self> {
        let n = value.appointment_number;
        let has_custom = value.custom_date.is_some()
            || value.custom_start_time.is_some()
            || value.custom_end_time.is_some();

        if value.skip == Some(true) {
            if has_custom {
                return Err(RecurringAppointmentError::Validation(format!(
                    "Override for appointment {} cannot both skip and reschedule",
                    n
                )));
            }
            return Ok(InstanceOverride {
                appointment_number: n,
                action: OverrideAction::Skip,
            });
        }

        match (value.custom_date, value.custom_start_time, value.custom_end_time) {
            (Some(date), Some(start), Some(end)) => Ok(InstanceOverride {
                appointment_number: n,
                action: OverrideAction::Reschedule(Reschedule::new(date, start, end)?),
            }),
            _ => Err(RecurringAppointmentError::Validation(format!(
                "Override for appointment {} must either skip or supply customDate, customStartTime and customEndTime",
                n
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithResolutionRequest {
    #[serde(flatten)]
    pub recurrence: RecurrenceRequest,
    #[serde(default)]
    pub appointment_overrides: Vec<AppointmentOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreationSummary {
    pub appointments_created: usize,
    pub skipped_count: usize,
    pub series_id: Uuid,
    #[serde(default)]
    pub appointment_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub created_count: usize,
    pub skipped_count: usize,
}

impl From<&CreationSummary> for CommitOutcome {
    fn from(summary: &CreationSummary) -> Self {
        Self {
            created_count: summary.appointments_created,
            skipped_count: summary.skipped_count,
        }
    }
}

// ==============================================================================
// WAITLIST MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaitlistPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WaitlistRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_type_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<NaiveDate>,
    #[serde(with = "hhmm_option", skip_serializing_if = "Option::is_none")]
    pub preferred_time_start: Option<NaiveTime>,
    #[serde(with = "hhmm_option", skip_serializing_if = "Option::is_none")]
    pub preferred_time_end: Option<NaiveTime>,
    pub priority: WaitlistPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub id: Uuid,
    #[serde(alias = "patient_id")]
    pub patient_id: Uuid,
    #[serde(alias = "provider_id")]
    pub provider_id: Uuid,
    #[serde(default, alias = "appointment_type_id")]
    pub appointment_type_id: Option<Uuid>,
    #[serde(alias = "preferred_date")]
    pub preferred_date: NaiveDate,
    #[serde(with = "hhmm", alias = "preferred_time_start")]
    pub preferred_time_start: NaiveTime,
    #[serde(with = "hhmm", alias = "preferred_time_end")]
    pub preferred_time_end: NaiveTime,
    pub priority: WaitlistPriority,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: String,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// DIRECTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DirectoryKind {
    Patients,
    Providers,
    AppointmentTypes,
}

impl DirectoryKind {
    pub fn table(&self) -> &'static str {
        match self {
            DirectoryKind::Patients => "patients",
            DirectoryKind::Providers => "providers",
            DirectoryKind::AppointmentTypes => "appointment_types",
        }
    }

    /// Column holding the searchable name. Appointment types keep theirs in
    /// `name`, the same column the type lookup reads.
    pub fn name_column(&self) -> &'static str {
        match self {
            DirectoryKind::Patients | DirectoryKind::Providers => "display_name",
            DirectoryKind::AppointmentTypes => "name",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: Uuid,
    #[serde(alias = "display_name")]
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base_request() -> RecurrenceRequest {
        RecurrenceRequest {
            provider_id: Some(Uuid::new_v4()),
            frequency: Some(Frequency::Weekly),
            start_date: Some(date(2024, 1, 1)),
            preferred_time: NaiveTime::from_hms_opt(9, 0, 0),
            total_appointments: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_request_deserializes_wire_format() {
        let body = json!({
            "providerId": "6f9619ff-8b86-d011-b42d-00cf4fc964ff",
            "frequency": "WEEKLY",
            "frequencyValue": 2,
            "startDate": "2024-01-01",
            "endDate": "2024-01-20",
            "preferredTime": "09:00"
        });
        let request: RecurrenceRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.frequency, Some(Frequency::Weekly));
        assert_eq!(request.frequency_value, Some(2));
        assert_eq!(request.preferred_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert!(request.total_appointments.is_none());
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let err = RecurrenceRequest::default().validate(date(2024, 1, 1)).unwrap_err();
        let RecurringAppointmentError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("providerId"));
        assert!(msg.contains("startDate"));
        assert!(msg.contains("preferredTime"));
        assert!(msg.contains("endDate or totalAppointments"));
    }

    #[test]
    fn test_validate_rejects_past_start_and_inverted_bounds() {
        let request = base_request();
        assert!(request.validate(date(2024, 1, 2)).is_err());

        let request = RecurrenceRequest {
            end_date: Some(date(2024, 1, 1)),
            ..base_request()
        };
        assert!(request.validate(date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_validate_normalizes_interval_and_total() {
        let request = RecurrenceRequest {
            frequency_value: Some(0),
            total_appointments: Some(500),
            ..base_request()
        };
        let validated = request.validate(date(2024, 1, 1)).unwrap();
        assert_eq!(validated.spec.interval_count, 1);
        assert_eq!(validated.spec.total_occurrences, Some(MAX_OCCURRENCES));

        let request = RecurrenceRequest {
            total_appointments: Some(-4),
            ..base_request()
        };
        let validated = request.validate(date(2024, 1, 1)).unwrap();
        assert_eq!(validated.spec.total_occurrences, Some(1));
    }

    #[test]
    fn test_missing_frequency_defaults_to_weekly() {
        let request = RecurrenceRequest {
            frequency: None,
            ..base_request()
        };
        let validated = request.validate(date(2024, 1, 1)).unwrap();
        assert_eq!(validated.spec.frequency, Frequency::Weekly);
        assert_eq!(validated.spec.step_days(), 7);
    }

    #[test]
    fn test_override_wire_shapes() {
        let skip = InstanceOverride {
            appointment_number: 2,
            action: OverrideAction::Skip,
        };
        assert_eq!(
            serde_json::to_value(AppointmentOverride::from(&skip)).unwrap(),
            json!({"appointmentNumber": 2, "skip": true})
        );

        let edit = InstanceOverride {
            appointment_number: 3,
            action: OverrideAction::Reschedule(
                Reschedule::new(
                    date(2024, 1, 16),
                    NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                )
                .unwrap(),
            ),
        };
        assert_eq!(
            serde_json::to_value(AppointmentOverride::from(&edit)).unwrap(),
            json!({
                "appointmentNumber": 3,
                "customDate": "2024-01-16",
                "customStartTime": "10:00",
                "customEndTime": "10:30"
            })
        );
    }

    #[test]
    fn test_override_rejects_mixed_and_partial_shapes() {
        let mixed = AppointmentOverride {
            appointment_number: 1,
            skip: Some(true),
            custom_date: Some(date(2024, 1, 2)),
            ..Default::default()
        };
        assert!(InstanceOverride::try_from(mixed).is_err());

        let partial = AppointmentOverride {
            appointment_number: 1,
            custom_date: Some(date(2024, 1, 2)),
            ..Default::default()
        };
        assert!(InstanceOverride::try_from(partial).is_err());
    }

    #[test]
    fn test_preview_counts_derived_from_rows() {
        let row = |n: u32, conflict: bool| PreviewAppointment {
            instance: AppointmentInstance {
                sequence_number: n,
                date: date(2024, 1, 1),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                duration_minutes: 30,
            },
            conflict: ConflictInfo {
                has_conflict: conflict,
                ..Default::default()
            },
        };
        let preview = PreviewResult::from_rows(vec![row(1, false), row(2, true), row(3, false)]);
        assert_eq!(preview.total_count, 3);
        assert_eq!(preview.available_count, 2);
        assert_eq!(preview.conflict_count, 1);
        assert_eq!(preview.total_count, preview.available_count + preview.conflict_count);
    }

    #[test]
    fn test_preview_row_flattens_instance_and_conflict() {
        let row = PreviewAppointment {
            instance: AppointmentInstance {
                sequence_number: 1,
                date: date(2024, 1, 1),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                duration_minutes: 30,
            },
            conflict: ConflictInfo::none(),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["appointmentNumber"], 1);
        assert_eq!(value["startTime"], "09:00");
        assert_eq!(value["hasConflict"], false);
    }

    #[test]
    fn test_appointment_type_timing_bounds_stored_values() {
        let profile = AppointmentTypeProfile {
            id: Uuid::nil(),
            name: "Therapy".to_string(),
            duration_minutes: 50,
            buffer_before_minutes: -5,
            buffer_after_minutes: 10,
        };
        let timing = profile.slot_timing().unwrap();
        assert_eq!(timing.duration_minutes, 50);
        assert_eq!(timing.buffers, BufferWindow { before_minutes: 0, after_minutes: 10 });

        let huge_buffer = AppointmentTypeProfile { buffer_after_minutes: i64::MAX, ..profile.clone() };
        assert!(matches!(
            huge_buffer.slot_timing(),
            Err(RecurringAppointmentError::Database(msg)) if msg.contains("buffer_after_minutes")
        ));

        let huge_duration = AppointmentTypeProfile { duration_minutes: MAX_SLOT_MINUTES + 1, ..profile };
        assert!(matches!(huge_duration.slot_timing(), Err(RecurringAppointmentError::Database(_))));
    }

    #[test]
    fn test_unknown_booking_status_is_active() {
        let status: BookingStatus = serde_json::from_value(json!("rescheduled")).unwrap();
        assert_eq!(status, BookingStatus::Unknown);
        assert!(status.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
    }
}
