use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

/// A patient appointment occupying `[start_time, end_time)` on the practice
/// calendar. Instants are epoch milliseconds; `end_time` is always derived
/// from `start_time + duration_minutes * 60000`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    pub start_time: i64,
    pub end_time: i64,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub series_id: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub flagged_notes: bool,
    pub reminder_sent: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
