use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecurringAppointmentError {
    /// A required field is missing or malformed. Raised before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Commit attempted while instances are still in conflict.
    #[error("Cannot commit: appointments {unresolved:?} still have unresolved conflicts")]
    ConflictBlocked { unresolved: Vec<u32> },

    /// Non-2xx answer from the scheduling service; the message is the server's own.
    #[error("{message}")]
    Service { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Appointment {appointment_number} cannot be {action} while {state}")]
    InvalidTransition {
        appointment_number: u32,
        state: &'static str,
        action: &'static str,
    },

    #[error("Appointment {0} is not part of this preview")]
    UnknownInstance(u32),

    /// Commit-time check found slots that collide with existing bookings.
    #[error("Scheduling conflicts detected for appointments {0:?}")]
    ConflictDetected(Vec<u32>),

    #[error("Database error: {0}")]
    Database(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl RecurringAppointmentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for failures of a remote call (as opposed to local rejections).
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Service { .. } | Self::Network(_))
    }
}

impl From<anyhow::Error> for RecurringAppointmentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<RecurringAppointmentError> for AppError {
    fn from(err: RecurringAppointmentError) -> Self {
        match err {
            RecurringAppointmentError::Validation(msg) => AppError::ValidationError(msg),
            RecurringAppointmentError::ConflictBlocked { .. } => AppError::Conflict(err.to_string()),
            RecurringAppointmentError::ConflictDetected(_) => AppError::Conflict(err.to_string()),
            RecurringAppointmentError::InvalidTransition { .. } => AppError::BadRequest(err.to_string()),
            RecurringAppointmentError::UnknownInstance(_) => AppError::BadRequest(err.to_string()),
            RecurringAppointmentError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            RecurringAppointmentError::Database(msg) => AppError::Database(msg),
            RecurringAppointmentError::Service { message, .. } => AppError::ExternalService(message),
            RecurringAppointmentError::Network(msg) => AppError::ExternalService(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecurringAppointmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_displays_server_message_verbatim() {
        let err = RecurringAppointmentError::Service {
            status: 422,
            message: "Provider is on leave".to_string(),
        };
        assert_eq!(err.to_string(), "Provider is on leave");
        assert!(err.is_remote());
    }

    #[test]
    fn test_conflict_detected_maps_to_http_conflict() {
        let app: AppError = RecurringAppointmentError::ConflictDetected(vec![2, 4]).into();
        assert!(matches!(app, AppError::Conflict(msg) if msg.contains("[2, 4]")));
    }

    #[test]
    fn test_validation_maps_to_validation() {
        let app: AppError = RecurringAppointmentError::validation("startDate is required").into();
        assert!(matches!(app, AppError::ValidationError(msg) if msg == "startDate is required"));
    }
}
