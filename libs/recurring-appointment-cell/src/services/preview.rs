// libs/recurring-appointment-cell/src/services/preview.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AppointmentInstance, BufferWindow, ExistingBooking, PreviewAppointment, PreviewResult,
    RecurrenceRequest, SlotTiming, ValidatedRecurrence,
};
use crate::services::conflict;
use crate::services::directory::AppointmentTypeSource;
use crate::services::expander;
use crate::services::store::BookingSource;

/// Produces advisory previews: expansion plus conflict detection, no writes.
pub struct PreviewEngine {
    bookings: Arc<dyn BookingSource>,
    appointment_types: Arc<dyn AppointmentTypeSource>,
    default_duration_minutes: i64,
}

impl PreviewEngine {
    pub fn new(
        bookings: Arc<dyn BookingSource>,
        appointment_types: Arc<dyn AppointmentTypeSource>,
        default_duration_minutes: i64,
    ) -> Self {
        Self {
            bookings,
            appointment_types,
            default_duration_minutes,
        }
    }

    /// Validate the request, expand it and flag conflicts per instance.
    #[instrument(skip(self, request), fields(provider_id = ?request.provider_id))]
    pub async fn preview(&self, request: &RecurrenceRequest, today: NaiveDate) -> Result<PreviewResult> {
        let validated = request.validate(today)?;
        self.preview_validated(&validated).await
    }

    pub async fn preview_validated(&self, validated: &ValidatedRecurrence) -> Result<PreviewResult> {
        let timing = self.slot_timing(validated.appointment_type_id).await?;
        let instances = expander::expand(&validated.spec, timing.duration_minutes)?;

        let bookings = match expander::date_span(&instances) {
            Some((from, to)) => {
                self.bookings
                    .bookings_in_range(validated.provider_id, from, to)
                    .await?
            }
            None => Vec::new(),
        };

        let preview = build_preview(instances, &bookings, timing.buffers);

        info!(
            total = preview.total_count,
            available = preview.available_count,
            conflicts = preview.conflict_count,
            "Recurring appointment preview generated"
        );

        Ok(preview)
    }

    /// Duration and buffers from the appointment type, or the configured
    /// default duration with no buffers when no type was chosen.
    pub async fn slot_timing(&self, appointment_type_id: Option<Uuid>) -> Result<SlotTiming> {
        resolve_slot_timing(
            self.appointment_types.as_ref(),
            appointment_type_id,
            self.default_duration_minutes,
        ).await
    }
}

pub async fn resolve_slot_timing(
    appointment_types: &dyn AppointmentTypeSource,
    appointment_type_id: Option<Uuid>,
    default_duration_minutes: i64,
) -> Result<SlotTiming> {
    match appointment_type_id {
        Some(id) => {
            let profile = appointment_types.appointment_type(id).await?;
            profile.slot_timing()
        }
        None => Ok(SlotTiming {
            duration_minutes: default_duration_minutes,
            buffers: BufferWindow::default(),
        }),
    }
}

/// Attach conflict information to each instance, keeping expansion order.
pub fn build_preview(
    instances: Vec<AppointmentInstance>,
    bookings: &[ExistingBooking],
    buffers: BufferWindow,
) -> PreviewResult {
    let rows = instances
        .into_iter()
        .map(|instance| {
            let conflict = conflict::detect(&instance, bookings, buffers);
            PreviewAppointment { instance, conflict }
        })
        .collect();

    PreviewResult::from_rows(rows)
}
