use serde::{Deserialize, Serialize};

use super::{Appointment, Blocker};

/// Anything occupying calendar time. Closed sum; conflict checking and
/// calendar assembly match on it exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Commitment {
    Appointment(Appointment),
    Blocker(Blocker),
}

impl Commitment {
    pub fn id(&self) -> &str {
        match self {
            Commitment::Appointment(a) => &a.id,
            Commitment::Blocker(b) => &b.id,
        }
    }

    pub fn start_time(&self) -> i64 {
        match self {
            Commitment::Appointment(a) => a.start_time,
            Commitment::Blocker(b) => b.start_time,
        }
    }

    pub fn end_time(&self) -> i64 {
        match self {
            Commitment::Appointment(a) => a.end_time,
            Commitment::Blocker(b) => b.end_time,
        }
    }

    /// Whether this commitment currently blocks other bookings.
    /// Blockers always do; appointments only while REQUESTED or CONFIRMED.
    pub fn occupies_calendar(&self) -> bool {
        match self {
            Commitment::Appointment(a) => a.status.is_active(),
            Commitment::Blocker(_) => true,
        }
    }

    /// Display label: patient name for appointments, title for blockers.
    pub fn label(&self) -> &str {
        match self {
            Commitment::Appointment(a) => &a.patient_name,
            Commitment::Blocker(b) => &b.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::AppointmentStatus;

    fn appointment(status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "a1".into(),
            patient_name: "Anna Schmidt".into(),
            start_time: 1000,
            end_time: 1000 + 30 * 60_000,
            duration_minutes: 30,
            status,
            series_id: None,
            contact_email: None,
            contact_phone: None,
            notes: None,
            flagged_notes: false,
            reminder_sent: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn cancelled_appointment_does_not_occupy_calendar() {
        let active = Commitment::Appointment(appointment(AppointmentStatus::Requested));
        let inert = Commitment::Appointment(appointment(AppointmentStatus::Cancelled));
        assert!(active.occupies_calendar());
        assert!(!inert.occupies_calendar());
    }

    #[test]
    fn serializes_with_lowercase_kind_tag() {
        let value =
            serde_json::to_value(Commitment::Appointment(appointment(AppointmentStatus::Requested)))
                .unwrap();
        assert_eq!(value["kind"], "appointment");
        assert_eq!(value["start_time"], 1000);

        let back: Commitment = serde_json::from_value(value).unwrap();
        assert_eq!(back.id(), "a1");
    }

    #[test]
    fn blocker_always_occupies_calendar() {
        let blocker = Commitment::Blocker(Blocker {
            id: "b1".into(),
            title: "Mittagspause".into(),
            start_time: 0,
            end_time: 3_600_000,
            blocker_group_id: None,
            created_at: 0,
        });
        assert!(blocker.occupies_calendar());
        assert_eq!(blocker.label(), "Mittagspause");
    }
}
