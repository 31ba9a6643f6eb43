// libs/recurring-appointment-cell/src/services/session.rs
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, instrument};

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{
    CommitOutcome, PreviewResult, RecurrenceRequest, Reschedule, ValidatedRecurrence,
    WaitlistEntry, WaitlistPriority, WaitlistRequest,
};
use crate::services::commit::CommitCoordinator;
use crate::services::gateway::{SchedulingGateway, WaitlistGateway};
use crate::services::resolution::{InstanceResolution, ResolutionTracker};

/// One operator pass over a recurring series: preview, resolve, commit.
///
/// The session owns its overrides until commit succeeds. A failed commit
/// hands the session back unchanged so the operator can retry.
pub struct PreviewSession<G: SchedulingGateway + WaitlistGateway> {
    gateway: Arc<G>,
    request: RecurrenceRequest,
    validated: ValidatedRecurrence,
    preview: PreviewResult,
    tracker: ResolutionTracker,
}

impl<G: SchedulingGateway + WaitlistGateway> PreviewSession<G> {
    /// Validate locally, then fetch the preview. Validation failures never
    /// reach the network.
    #[instrument(skip_all)]
    pub async fn open(gateway: Arc<G>, request: RecurrenceRequest, today: NaiveDate) -> Result<Self> {
        let validated = request.validate(today)?;
        let preview = gateway.preview(&request).await?;
        let tracker = ResolutionTracker::from_preview(&preview);

        info!(
            "Preview opened: {} appointments, {} in conflict",
            preview.total_count, preview.conflict_count
        );

        Ok(Self {
            gateway,
            request,
            validated,
            preview,
            tracker,
        })
    }

    pub fn preview(&self) -> &PreviewResult {
        &self.preview
    }

    pub fn tracker(&self) -> &ResolutionTracker {
        &self.tracker
    }

    pub fn request(&self) -> &RecurrenceRequest {
        &self.request
    }

    pub fn state(&self, appointment_number: u32) -> Option<&InstanceResolution> {
        self.tracker.state(appointment_number)
    }

    pub fn can_commit(&self) -> bool {
        self.tracker.can_commit()
    }

    pub fn skip(&mut self, appointment_number: u32) -> Result<()> {
        self.tracker.skip(appointment_number)
    }

    pub fn unskip(&mut self, appointment_number: u32) -> Result<()> {
        self.tracker.unskip(appointment_number)
    }

    pub fn edit(
        &mut self,
        appointment_number: u32,
        custom_date: NaiveDate,
        custom_start_time: NaiveTime,
        custom_end_time: NaiveTime,
    ) -> Result<()> {
        let reschedule = Reschedule::new(custom_date, custom_start_time, custom_end_time)?;
        self.tracker.edit(appointment_number, reschedule)
    }

    pub fn reset(&mut self, appointment_number: u32) -> Result<()> {
        self.tracker.reset(appointment_number)
    }

    /// Move one conflicted instance to the waitlist, keeping its original slot
    /// as the preferred window.
    pub async fn waitlist(
        &mut self,
        appointment_number: u32,
        priority: WaitlistPriority,
        notes: Option<String>,
    ) -> Result<WaitlistEntry> {
        let request = self.waitlist_request(appointment_number, priority, notes)?;
        self.tracker
            .waitlist(appointment_number, self.gateway.as_ref(), &request)
            .await
    }

    /// Waitlist every instance still in conflict. Each call stands alone;
    /// failures leave their instance in `Conflict`.
    pub async fn waitlist_conflicts(
        &mut self,
        priority: WaitlistPriority,
    ) -> Vec<(u32, Result<WaitlistEntry>)> {
        let mut requests = Vec::new();
        let mut rejected = Vec::new();
        for n in self.tracker.unresolved() {
            match self.waitlist_request(n, priority, None) {
                Ok(request) => requests.push((n, request)),
                Err(e) => rejected.push((n, Err(e))),
            }
        }

        let mut results = self
            .tracker
            .waitlist_many(self.gateway.as_ref(), requests)
            .await;
        results.extend(rejected);
        results.sort_by_key(|(n, _)| *n);
        results
    }

    /// Submit the resolved series. On failure the session comes back intact.
    pub async fn commit(self) -> std::result::Result<CommitOutcome, CommitFailure<G>> {
        let coordinator = CommitCoordinator::new(self.gateway.clone());
        match coordinator.commit(&self.request, &self.tracker).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => Err(CommitFailure { session: self, error }),
        }
    }

    fn waitlist_request(
        &self,
        appointment_number: u32,
        priority: WaitlistPriority,
        notes: Option<String>,
    ) -> Result<WaitlistRequest> {
        let row = self
            .preview
            .find(appointment_number)
            .ok_or(RecurringAppointmentError::UnknownInstance(appointment_number))?;

        let patient_id = self.validated.patient_id.ok_or_else(|| {
            RecurringAppointmentError::validation("A patient is required to join the waitlist")
        })?;

        Ok(WaitlistRequest {
            patient_id: Some(patient_id),
            provider_id: Some(self.validated.provider_id),
            appointment_type_id: self.validated.appointment_type_id,
            preferred_date: Some(row.instance.date),
            preferred_time_start: Some(row.instance.start_time),
            preferred_time_end: Some(row.instance.end_time),
            priority,
            notes: notes.or_else(|| self.request.notes.clone()),
        })
    }
}

/// A rejected commit, carrying the session so nothing has to be re-resolved.
pub struct CommitFailure<G: SchedulingGateway + WaitlistGateway> {
    pub session: PreviewSession<G>,
    pub error: RecurringAppointmentError,
}

impl<G: SchedulingGateway + WaitlistGateway> fmt::Debug for CommitFailure<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitFailure")
            .field("error", &self.error)
            .field("unresolved", &self.session.tracker.unresolved())
            .finish()
    }
}

impl<G: SchedulingGateway + WaitlistGateway> fmt::Display for CommitFailure<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}
