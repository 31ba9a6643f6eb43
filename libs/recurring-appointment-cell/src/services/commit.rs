// libs/recurring-appointment-cell/src/services/commit.rs
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{
    AppointmentOverride, CommitOutcome, CreateWithResolutionRequest, RecurrenceRequest,
};
use crate::services::gateway::SchedulingGateway;
use crate::services::resolution::ResolutionTracker;

/// Turns a resolved preview into one all-or-nothing creation request.
pub struct CommitCoordinator<G: SchedulingGateway + ?Sized> {
    gateway: Arc<G>,
}

impl<G: SchedulingGateway + ?Sized> CommitCoordinator<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Submit the recurrence with every override the tracker holds.
    ///
    /// Refuses locally, without a network call, while any instance is still
    /// in conflict. On failure nothing is created and the tracker is untouched.
    #[instrument(skip_all)]
    pub async fn commit(
        &self,
        request: &RecurrenceRequest,
        tracker: &ResolutionTracker,
    ) -> Result<CommitOutcome> {
        let payload = build_payload(request, tracker)?;
        let overrides = payload.appointment_overrides.len();

        let summary = self.gateway
            .create_with_resolution(&payload)
            .await
            .map_err(|e| {
                warn!("Series creation rejected: {}", e);
                e
            })?;

        info!(
            "Series {} created: {} appointments, {} skipped ({} overrides sent)",
            summary.series_id, summary.appointments_created, summary.skipped_count, overrides
        );

        Ok(CommitOutcome::from(&summary))
    }

    /// Plain creation for a preview that had no conflicts to resolve.
    pub async fn create_without_overrides(&self, request: &RecurrenceRequest) -> Result<CommitOutcome> {
        let summary = self.gateway.create(request).await?;
        info!(
            "Series {} created without overrides: {} appointments",
            summary.series_id, summary.appointments_created
        );
        Ok(CommitOutcome::from(&summary))
    }
}

/// The creation payload: the original recurrence fields plus one override
/// per skipped, waitlisted or rescheduled instance.
pub fn build_payload(
    request: &RecurrenceRequest,
    tracker: &ResolutionTracker,
) -> Result<CreateWithResolutionRequest> {
    if !tracker.can_commit() {
        return Err(RecurringAppointmentError::ConflictBlocked {
            unresolved: tracker.unresolved(),
        });
    }

    let appointment_overrides = tracker
        .overrides()
        .iter()
        .map(AppointmentOverride::from)
        .collect();

    Ok(CreateWithResolutionRequest {
        recurrence: request.clone(),
        appointment_overrides,
    })
}
