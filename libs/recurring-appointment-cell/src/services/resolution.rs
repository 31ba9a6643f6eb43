//! Per-instance resolution state for one preview session.
//!
//! Each instance of a preview is in exactly one [`InstanceResolution`] state.
//! Commit is only allowed once no instance is left in `Conflict`.
//!
//! | From       | Action              | To         |
//! |------------|---------------------|------------|
//! | Conflict   | skip                | Skipped    |
//! | Skipped    | unskip              | Conflict   |
//! | Conflict   | edit                | Modified   |
//! | Modified   | edit                | Modified   |
//! | Modified   | skip                | Skipped    |
//! | Modified   | reset               | Conflict   |
//! | Conflict   | waitlist (success)  | Waitlisted |
//!
//! Waitlisted instances are committed as skipped and have no way back.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{
    InstanceOverride, OverrideAction, PreviewResult, Reschedule, WaitlistEntry, WaitlistRequest,
};
use crate::services::gateway::WaitlistGateway;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceResolution {
    /// No conflict was detected; nothing to do.
    Available,
    /// Conflict detected and not yet resolved. Blocks commit.
    Conflict,
    Skipped,
    /// Operator-chosen slot. Not re-checked locally; the server verifies it
    /// at commit time.
    Modified(Reschedule),
    Waitlisted { entry_id: Option<Uuid> },
}

impl InstanceResolution {
    pub fn label(&self) -> &'static str {
        match self {
            InstanceResolution::Available => "available",
            InstanceResolution::Conflict => "in conflict",
            InstanceResolution::Skipped => "skipped",
            InstanceResolution::Modified(_) => "modified",
            InstanceResolution::Waitlisted { .. } => "waitlisted",
        }
    }

    pub fn blocks_commit(&self) -> bool {
        matches!(self, InstanceResolution::Conflict)
    }

    fn override_action(&self) -> Option<OverrideAction> {
        match self {
            InstanceResolution::Skipped | InstanceResolution::Waitlisted { .. } => Some(OverrideAction::Skip),
            InstanceResolution::Modified(reschedule) => Some(OverrideAction::Reschedule(reschedule.clone())),
            InstanceResolution::Available | InstanceResolution::Conflict => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Action {
    Skip,
    Unskip,
    Edit(Reschedule),
    Reset,
    Waitlist(Option<Uuid>),
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Skip => "skipped",
            Action::Unskip => "unskipped",
            Action::Edit(_) => "edited",
            Action::Reset => "reset",
            Action::Waitlist(_) => "waitlisted",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionCounts {
    pub available: usize,
    pub conflict: usize,
    pub skipped: usize,
    pub modified: usize,
    pub waitlisted: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionTracker {
    states: BTreeMap<u32, InstanceResolution>,
}

impl ResolutionTracker {
    /// Initial state: `Conflict` for flagged rows, `Available` otherwise.
    pub fn from_preview(preview: &PreviewResult) -> Self {
        let states = preview
            .preview_appointments
            .iter()
            .map(|row| {
                let state = if row.conflict.has_conflict {
                    InstanceResolution::Conflict
                } else {
                    InstanceResolution::Available
                };
                (row.instance.sequence_number, state)
            })
            .collect();
        Self { states }
    }

    pub fn state(&self, appointment_number: u32) -> Option<&InstanceResolution> {
        self.states.get(&appointment_number)
    }

    /// States in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &InstanceResolution)> {
        self.states.iter().map(|(n, state)| (*n, state))
    }

    pub fn skip(&mut self, appointment_number: u32) -> Result<()> {
        self.apply(appointment_number, Action::Skip)
    }

    pub fn unskip(&mut self, appointment_number: u32) -> Result<()> {
        self.apply(appointment_number, Action::Unskip)
    }

    pub fn edit(&mut self, appointment_number: u32, reschedule: Reschedule) -> Result<()> {
        self.apply(appointment_number, Action::Edit(reschedule))
    }

    pub fn reset(&mut self, appointment_number: u32) -> Result<()> {
        self.apply(appointment_number, Action::Reset)
    }

    /// Record a waitlist entry created elsewhere for this instance.
    pub fn mark_waitlisted(&mut self, appointment_number: u32, entry_id: Option<Uuid>) -> Result<()> {
        self.apply(appointment_number, Action::Waitlist(entry_id))
    }

    /// Fails unless the instance may currently move to the waitlist.
    pub fn ensure_can_waitlist(&self, appointment_number: u32) -> Result<()> {
        let current = self.current(appointment_number)?;
        next_state(appointment_number, current, &Action::Waitlist(None)).map(|_| ())
    }

    /// Create the waitlist entry remotely, then transition. A failed call
    /// leaves the instance exactly as it was.
    pub async fn waitlist(
        &mut self,
        appointment_number: u32,
        gateway: &dyn WaitlistGateway,
        request: &WaitlistRequest,
    ) -> Result<WaitlistEntry> {
        self.ensure_can_waitlist(appointment_number)?;

        let entry = gateway.add_to_waitlist(request).await?;
        self.mark_waitlisted(appointment_number, Some(entry.id))?;
        info!("Appointment {} moved to waitlist entry {}", appointment_number, entry.id);
        Ok(entry)
    }

    /// Waitlist several instances with independent, concurrent calls.
    ///
    /// Successful calls transition their instance; failed ones stay in
    /// `Conflict`. There is no rollback between instances. A number listed
    /// more than once is called for only on its first occurrence.
    pub async fn waitlist_many(
        &mut self,
        gateway: &dyn WaitlistGateway,
        requests: Vec<(u32, WaitlistRequest)>,
    ) -> Vec<(u32, Result<WaitlistEntry>)> {
        let mut seen = BTreeSet::new();
        let prepared: Vec<_> = requests
            .into_iter()
            .map(|(n, request)| {
                let precheck = if seen.insert(n) {
                    self.ensure_can_waitlist(n)
                } else {
                    Err(RecurringAppointmentError::Validation(format!(
                        "Appointment {} is listed more than once",
                        n
                    )))
                };
                (n, precheck, request)
            })
            .collect();

        let calls = prepared.into_iter().map(|(n, precheck, request)| {
            async move {
                let result = match precheck {
                    Ok(()) => gateway.add_to_waitlist(&request).await,
                    Err(e) => Err(e),
                };
                (n, result)
            }
        });

        let results = join_all(calls).await;

        results
            .into_iter()
            .map(|(n, result)| {
                let result = result.and_then(|entry| {
                    self.mark_waitlisted(n, Some(entry.id))?;
                    Ok(entry)
                });
                if let Err(e) = &result {
                    warn!("Waitlisting appointment {} failed: {}", n, e);
                }
                (n, result)
            })
            .collect()
    }

    /// True when no instance is left in `Conflict`.
    pub fn can_commit(&self) -> bool {
        !self.states.values().any(InstanceResolution::blocks_commit)
    }

    /// Appointment numbers still blocking commit, ascending.
    pub fn unresolved(&self) -> Vec<u32> {
        self.states
            .iter()
            .filter(|(_, state)| state.blocks_commit())
            .map(|(n, _)| *n)
            .collect()
    }

    /// One override per non-default resolution, in sequence order.
    pub fn overrides(&self) -> Vec<InstanceOverride> {
        self.states
            .iter()
            .filter_map(|(n, state)| {
                state.override_action().map(|action| InstanceOverride {
                    appointment_number: *n,
                    action,
                })
            })
            .collect()
    }

    /// Modified slots have not been re-checked for conflicts.
    pub fn is_verified(&self, appointment_number: u32) -> bool {
        !matches!(self.state(appointment_number), Some(InstanceResolution::Modified(_)))
    }

    pub fn counts(&self) -> ResolutionCounts {
        let mut counts = ResolutionCounts::default();
        for state in self.states.values() {
            match state {
                InstanceResolution::Available => counts.available += 1,
                InstanceResolution::Conflict => counts.conflict += 1,
                InstanceResolution::Skipped => counts.skipped += 1,
                InstanceResolution::Modified(_) => counts.modified += 1,
                InstanceResolution::Waitlisted { .. } => counts.waitlisted += 1,
            }
        }
        counts
    }

    fn current(&self, appointment_number: u32) -> Result<&InstanceResolution> {
        self.states
            .get(&appointment_number)
            .ok_or(RecurringAppointmentError::UnknownInstance(appointment_number))
    }

    fn apply(&mut self, appointment_number: u32, action: Action) -> Result<()> {
        let current = self.current(appointment_number)?;
        let next = next_state(appointment_number, current, &action)?;
        debug!(
            "Appointment {}: {} -> {}",
            appointment_number,
            current.label(),
            next.label()
        );
        self.states.insert(appointment_number, next);
        Ok(())
    }
}

fn next_state(
    appointment_number: u32,
    current: &InstanceResolution,
    action: &Action,
) -> Result<InstanceResolution> {
    use InstanceResolution::*;

    let next = match (current, action) {
        (Conflict | Modified(_), Action::Skip) => Skipped,
        (Skipped, Action::Unskip) => Conflict,
        (Conflict | Modified(_), Action::Edit(reschedule)) => Modified(reschedule.clone()),
        (Modified(_), Action::Reset) => Conflict,
        (Conflict, Action::Waitlist(entry_id)) => Waitlisted { entry_id: *entry_id },
        (state, action) => {
            return Err(RecurringAppointmentError::InvalidTransition {
                appointment_number,
                state: state.label(),
                action: action.verb(),
            })
        }
    };

    Ok(next)
}
