//! Engine error taxonomy.
//!
//! Every operation returns a structured outcome so the embedding layer can
//! map kinds to distinct responses: validation → 400, slot conflicts → 409,
//! bad transitions → 409, missing rows → 404, storage failures → 500.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;

#[derive(Error, Debug)]
pub enum SchedulingError {
    /// Malformed input, rejected before any storage access.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The requested interval overlaps an existing active commitment.
    /// The caller should offer a different time; this engine never retries.
    #[error("Slot already taken: [{start_time}, {end_time}) overlaps an existing commitment")]
    SlotTaken { start_time: i64, end_time: i64 },

    /// A lifecycle action was requested from a status that does not permit it.
    #[error("Cannot {action} an appointment in status {}", status.as_str())]
    InvalidTransition {
        action: &'static str,
        status: AppointmentStatus,
    },

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error(transparent)]
    Storage(DatabaseError),
}

impl From<DatabaseError> for SchedulingError {
    // NotFound stays its own kind so callers keep the 404 mapping.
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                SchedulingError::NotFound { entity_type, id }
            }
            other => SchedulingError::Storage(other),
        }
    }
}

impl SchedulingError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        SchedulingError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True for the slot-contention conflict outcome.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SchedulingError::SlotTaken { .. })
    }
}
