// libs/recurring-appointment-cell/src/services/creation.rs
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{
    AppointmentInstance, AppointmentOverride, BookingStatus, BufferWindow,
    CreateWithResolutionRequest, CreationSummary, ExistingBooking, InstanceOverride,
    NewAppointment, OverrideAction, RecurrenceRequest,
};
use crate::services::conflict;
use crate::services::directory::AppointmentTypeSource;
use crate::services::expander;
use crate::services::preview::resolve_slot_timing;
use crate::services::store::AppointmentStore;

/// A slot that will actually be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSlot {
    pub sequence_number: u32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
    pub rescheduled: bool,
}

/// Server-side, all-or-nothing creation of a recurring series.
pub struct BatchCreationService {
    store: Arc<dyn AppointmentStore>,
    appointment_types: Arc<dyn AppointmentTypeSource>,
    default_duration_minutes: i64,
}

impl BatchCreationService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        appointment_types: Arc<dyn AppointmentTypeSource>,
        default_duration_minutes: i64,
    ) -> Self {
        Self {
            store,
            appointment_types,
            default_duration_minutes,
        }
    }

    pub async fn create(&self, request: &RecurrenceRequest, today: NaiveDate) -> Result<CreationSummary> {
        self.create_series(request, &[], today).await
    }

    pub async fn create_with_resolution(
        &self,
        request: &CreateWithResolutionRequest,
        today: NaiveDate,
    ) -> Result<CreationSummary> {
        self.create_series(&request.recurrence, &request.appointment_overrides, today).await
    }

    #[instrument(skip_all, fields(overrides = overrides.len()))]
    async fn create_series(
        &self,
        request: &RecurrenceRequest,
        overrides: &[AppointmentOverride],
        today: NaiveDate,
    ) -> Result<CreationSummary> {
        let validated = request.validate(today)?;
        let timing = resolve_slot_timing(
            self.appointment_types.as_ref(),
            validated.appointment_type_id,
            self.default_duration_minutes,
        ).await?;

        let instances = expander::expand(&validated.spec, timing.duration_minutes)?;
        let overrides = index_overrides(&instances, overrides, today)?;
        let (slots, skipped_count) = plan_slots(&instances, &overrides);

        let series_id = Uuid::new_v4();

        if slots.is_empty() {
            info!("Every appointment of series {} was skipped, nothing stored", series_id);
            return Ok(CreationSummary {
                appointments_created: 0,
                skipped_count,
                series_id,
                appointment_ids: Vec::new(),
            });
        }

        let bookings = match slot_span(&slots) {
            Some((from, to)) => self.store.bookings_in_range(validated.provider_id, from, to).await?,
            None => Vec::new(),
        };

        let conflicts = find_conflicts(&slots, &bookings, timing.buffers);
        if !conflicts.is_empty() {
            warn!("Rejecting series: appointments {:?} conflict", conflicts);
            return Err(RecurringAppointmentError::ConflictDetected(conflicts));
        }

        let rows: Vec<NewAppointment> = slots
            .iter()
            .map(|slot| NewAppointment {
                series_id,
                sequence_number: slot.sequence_number,
                provider_id: validated.provider_id,
                patient_id: validated.patient_id,
                appointment_type_id: validated.appointment_type_id,
                appointment_date: slot.date,
                start_time: slot.start_time,
                end_time: slot.end_time,
                duration_minutes: slot.duration_minutes,
                status: BookingStatus::Scheduled,
                is_rescheduled: slot.rescheduled,
                notes: request.notes.clone(),
            })
            .collect();

        let appointment_ids = self.store.insert_series(&rows).await?;

        info!(
            "Created series {}: {} appointments, {} skipped",
            series_id,
            appointment_ids.len(),
            skipped_count
        );

        Ok(CreationSummary {
            appointments_created: appointment_ids.len(),
            skipped_count,
            series_id,
            appointment_ids,
        })
    }
}

/// Parse and check overrides against the expansion. Numbers must exist and
/// appear once; custom dates may not lie in the past.
pub fn index_overrides(
    instances: &[AppointmentInstance],
    overrides: &[AppointmentOverride],
    today: NaiveDate,
) -> Result<BTreeMap<u32, OverrideAction>> {
    let known: BTreeSet<u32> = instances.iter().map(|i| i.sequence_number).collect();
    let mut indexed = BTreeMap::new();

    for raw in overrides {
        let parsed = InstanceOverride::try_from(raw.clone())?;
        let n = parsed.appointment_number;

        if !known.contains(&n) {
            return Err(RecurringAppointmentError::Validation(format!(
                "Override refers to appointment {} which is not part of this series",
                n
            )));
        }

        if let OverrideAction::Reschedule(reschedule) = &parsed.action {
            if reschedule.custom_date < today {
                return Err(RecurringAppointmentError::Validation(format!(
                    "customDate {} for appointment {} is in the past",
                    reschedule.custom_date, n
                )));
            }
        }

        if indexed.insert(n, parsed.action).is_some() {
            return Err(RecurringAppointmentError::Validation(format!(
                "Appointment {} has more than one override",
                n
            )));
        }
    }

    Ok(indexed)
}

/// Apply overrides to the expansion: skips drop out, reschedules replace the
/// slot. Returns the slots in sequence order and the number skipped.
pub fn plan_slots(
    instances: &[AppointmentInstance],
    overrides: &BTreeMap<u32, OverrideAction>,
) -> (Vec<PlannedSlot>, usize) {
    let mut slots = Vec::with_capacity(instances.len());
    let mut skipped = 0;

    for instance in instances {
        match overrides.get(&instance.sequence_number) {
            Some(OverrideAction::Skip) => skipped += 1,
            Some(OverrideAction::Reschedule(r)) => slots.push(PlannedSlot {
                sequence_number: instance.sequence_number,
                date: r.custom_date,
                start_time: r.custom_start_time,
                end_time: r.custom_end_time,
                duration_minutes: r.duration_minutes(),
                rescheduled: true,
            }),
            None => slots.push(PlannedSlot {
                sequence_number: instance.sequence_number,
                date: instance.date,
                start_time: instance.start_time,
                end_time: instance.end_time,
                duration_minutes: instance.duration_minutes,
                rescheduled: false,
            }),
        }
    }

    (slots, skipped)
}

fn slot_span(slots: &[PlannedSlot]) -> Option<(NaiveDate, NaiveDate)> {
    let first = slots.iter().map(|s| s.date).min()?;
    let last = slots.iter().map(|s| s.date).max()?;
    Some((first, last))
}

/// Appointment numbers that collide with a stored booking or with an earlier
/// slot of the same batch, ascending. Of two colliding batch slots the later
/// one in sequence order is reported.
pub fn find_conflicts(
    slots: &[PlannedSlot],
    bookings: &[ExistingBooking],
    buffers: BufferWindow,
) -> Vec<u32> {
    let mut conflicts = BTreeSet::new();

    for (idx, slot) in slots.iter().enumerate() {
        let info = conflict::detect_slot(slot.date, slot.start_time, slot.end_time, bookings, buffers);
        if info.has_conflict {
            conflicts.insert(slot.sequence_number);
            continue;
        }

        if slots[..idx].iter().any(|earlier| slots_collide(earlier, slot, buffers)) {
            conflicts.insert(slot.sequence_number);
        }
    }

    conflicts.into_iter().collect()
}

/// Two slots of one series collide when either one's buffered window
/// overlaps the other's booked time. The answer does not depend on order.
fn slots_collide(a: &PlannedSlot, b: &PlannedSlot, buffers: BufferWindow) -> bool {
    let buffered_overlaps = |x: &PlannedSlot, y: &PlannedSlot| {
        let (window_start, window_end) =
            conflict::occupied_window(x.date, x.start_time, x.end_time, buffers);
        conflict::ranges_overlap(
            window_start,
            window_end,
            y.date.and_time(y.start_time),
            y.date.and_time(y.end_time),
        )
    };
    buffered_overlaps(a, b) || buffered_overlaps(b, a)
}
