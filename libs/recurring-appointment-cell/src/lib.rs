pub mod models;
pub mod services;
pub mod error;
pub mod handlers;
pub mod router;

pub use models::*;
pub use error::{RecurringAppointmentError, Result};
pub use services::*;
pub use router::{directory_routes, recurring_appointment_routes, waitlist_routes};
