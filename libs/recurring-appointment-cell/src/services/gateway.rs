use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    CreateWithResolutionRequest, CreationSummary, PreviewResult, RecurrenceRequest,
    WaitlistEntry, WaitlistRequest,
};

/// Remote scheduling operations the operator workflow depends on.
#[async_trait]
pub trait SchedulingGateway: Send + Sync {
    async fn preview(&self, request: &RecurrenceRequest) -> Result<PreviewResult>;

    /// Resolution-aware, all-or-nothing creation.
    async fn create_with_resolution(&self, request: &CreateWithResolutionRequest) -> Result<CreationSummary>;

    /// Plain creation without overrides.
    async fn create(&self, request: &RecurrenceRequest) -> Result<CreationSummary>;
}

#[async_trait]
pub trait WaitlistGateway: Send + Sync {
    async fn add_to_waitlist(&self, request: &WaitlistRequest) -> Result<WaitlistEntry>;
}
