pub mod expander;
pub mod conflict;
pub mod store;
pub mod directory;
pub mod preview;
pub mod creation;
pub mod waitlist;

// Operator-side workflow against the scheduling service
pub mod gateway;
pub mod client;
pub mod resolution;
pub mod commit;
pub mod session;

pub use store::{AppointmentStore, BookingSource, SupabaseAppointmentStore};
pub use directory::{AppointmentTypeSource, DirectoryService};
pub use preview::PreviewEngine;
pub use creation::BatchCreationService;
pub use waitlist::WaitlistService;
pub use gateway::{SchedulingGateway, WaitlistGateway};
pub use client::SchedulingClient;
pub use resolution::{InstanceResolution, ResolutionCounts, ResolutionTracker};
pub use commit::CommitCoordinator;
pub use session::{CommitFailure, PreviewSession};
