// libs/reconciliation-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime, TimeZone};
use std::fmt;

// ==============================================================================
// CORE EVENT MODELS
// ==============================================================================

/// An appointment-like record eligible for no-show evaluation. Urologist
/// appointments and investigation bookings share this shape; the table they
/// come from is tracked separately as an [`EventKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulableEvent {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: EventStatus,
    pub counterparty_name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SchedulableEvent {
    /// The scheduled instant as a single combined value. Cutoff comparison
    /// must always go through this, never through date and time separately,
    /// or events near midnight are classified a day off.
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.scheduled_date.and_time(self.scheduled_time))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UrologistAppointment,
    InvestigationBooking,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [
        EventKind::UrologistAppointment,
        EventKind::InvestigationBooking,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            EventKind::UrologistAppointment => "urologist_appointments",
            EventKind::InvestigationBooking => "investigation_bookings",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::UrologistAppointment => write!(f, "urologist appointment"),
            EventKind::InvestigationBooking => write!(f, "investigation booking"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl EventStatus {
    /// Statuses still eligible for automatic no-show transition. Everything
    /// else is terminal as far as this job is concerned.
    pub fn is_reconcilable(&self) -> bool {
        matches!(self, EventStatus::Scheduled | EventStatus::Confirmed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Scheduled => write!(f, "scheduled"),
            EventStatus::Confirmed => write!(f, "confirmed"),
            EventStatus::Completed => write!(f, "completed"),
            EventStatus::Cancelled => write!(f, "cancelled"),
            EventStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// AUDIT TRAIL MODELS
// ==============================================================================

pub const NOTE_TYPE_NO_SHOW: &str = "no_show";
pub const SYSTEM_AUTHOR_NAME: &str = "System";
pub const SYSTEM_AUTHOR_ROLE: &str = "Automated";

/// Immutable timeline entry. Clinicians create these through the main API;
/// the reconciliation job appends `no_show` entries of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub note_type: String,
    pub note_content: String,
    pub author_name: String,
    pub author_role: String,
    pub created_at: DateTime<Utc>,
}

impl ClinicalNote {
    /// System-authored audit entry recording an automatic no-show mark.
    pub fn no_show(patient_id: Uuid, note_content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            note_type: NOTE_TYPE_NO_SHOW.to_string(),
            note_content,
            author_name: SYSTEM_AUTHOR_NAME.to_string(),
            author_role: SYSTEM_AUTHOR_ROLE.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// One unit of the write phase: which event to mark and the audit note text
/// to record alongside it. The whole batch for a run commits atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoShowTransition {
    pub kind: EventKind,
    pub event_id: Uuid,
    pub patient_id: Uuid,
    pub note_content: String,
}

// ==============================================================================
// ACTIVITY DETECTION MODELS
// ==============================================================================

/// Which signal source reported patient activity after the scheduled instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivitySignal {
    PatientRecordUpdated,
    ClinicalNoteAdded,
    InvestigationResultAdded,
    NewAppointmentBooked,
}

impl fmt::Display for ActivitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivitySignal::PatientRecordUpdated => write!(f, "patient record updated"),
            ActivitySignal::ClinicalNoteAdded => write!(f, "clinical note added"),
            ActivitySignal::InvestigationResultAdded => write!(f, "investigation result added"),
            ActivitySignal::NewAppointmentBooked => write!(f, "new appointment booked"),
        }
    }
}

/// Outcome of the activity predicate for one candidate. `CheckFailed` is the
/// named fail-safe: a probe error means the patient is presumed attended, and
/// operators can tell it apart from genuine activity in logs and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
    Activity(ActivitySignal),
    NoActivity,
    CheckFailed,
}

// ==============================================================================
// RUN SUMMARY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VariantSummary {
    pub inspected: usize,
    pub presumed_attended: usize,
    pub marked_no_show: usize,
}

/// Informational per-run report. Not used for control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub appointments: VariantSummary,
    pub investigations: VariantSummary,
    pub detection_failures: usize,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            appointments: VariantSummary::default(),
            investigations: VariantSummary::default(),
            detection_failures: 0,
        }
    }

    pub fn variant_mut(&mut self, kind: EventKind) -> &mut VariantSummary {
        match kind {
            EventKind::UrologistAppointment => &mut self.appointments,
            EventKind::InvestigationBooking => &mut self.investigations,
        }
    }

    pub fn total_inspected(&self) -> usize {
        self.appointments.inspected + self.investigations.inspected
    }

    pub fn total_marked(&self) -> usize {
        self.appointments.marked_no_show + self.investigations.marked_no_show
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_at_combines_date_and_time() {
        let event = SchedulableEvent {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            scheduled_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
            status: EventStatus::Scheduled,
            counterparty_name: "Mr. Hale".to_string(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        assert_eq!(event.scheduled_at(), expected);

        // A midnight-adjacent event must stay on its own day.
        let next_day = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(event.scheduled_at() < next_day);
    }

    #[test]
    fn only_scheduled_and_confirmed_are_reconcilable() {
        assert!(EventStatus::Scheduled.is_reconcilable());
        assert!(EventStatus::Confirmed.is_reconcilable());
        assert!(!EventStatus::Completed.is_reconcilable());
        assert!(!EventStatus::Cancelled.is_reconcilable());
        assert!(!EventStatus::NoShow.is_reconcilable());
    }

    #[test]
    fn status_serializes_to_database_strings() {
        assert_eq!(
            serde_json::to_string(&EventStatus::NoShow).unwrap(),
            "\"no_show\""
        );
        assert_eq!(EventStatus::NoShow.to_string(), "no_show");
    }

    #[test]
    fn no_show_note_carries_system_authorship() {
        let note = ClinicalNote::no_show(Uuid::new_v4(), "missed appointment".to_string());
        assert_eq!(note.note_type, "no_show");
        assert_eq!(note.author_name, "System");
        assert_eq!(note.author_role, "Automated");
    }
}
