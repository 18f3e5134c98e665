// Shared test fixtures: an in-memory ReconciliationStore with failure
// injection, plus event builders.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use reconciliation_cell::error::ReconciliationError;
use reconciliation_cell::models::{
    ClinicalNote, EventKind, EventStatus, NoShowTransition, SchedulableEvent,
};
use reconciliation_cell::services::store::ReconciliationStore;

/// In-memory stand-in for the clinical database. Probe failures, commit
/// failures and probe latency can all be injected per test.
#[derive(Default)]
pub struct InMemoryStore {
    pub appointments: Mutex<Vec<SchedulableEvent>>,
    pub bookings: Mutex<Vec<SchedulableEvent>>,
    pub patient_updates: Mutex<Vec<(Uuid, DateTime<Utc>)>>,
    pub notes: Mutex<Vec<ClinicalNote>>,
    pub investigation_results: Mutex<Vec<(Uuid, DateTime<Utc>)>>,

    pub fail_probes: AtomicBool,
    pub fail_commit_at: Mutex<Option<usize>>,
    pub probe_calls: AtomicUsize,
    pub probe_delay: Mutex<Option<StdDuration>>,
}

impl InMemoryStore {
    pub fn add_appointment(&self, event: SchedulableEvent) {
        self.appointments.lock().unwrap().push(event);
    }

    pub fn add_booking(&self, event: SchedulableEvent) {
        self.bookings.lock().unwrap().push(event);
    }

    pub fn appointment(&self, id: Uuid) -> SchedulableEvent {
        self.appointments
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .expect("unknown appointment id")
    }

    pub fn booking(&self, id: Uuid) -> SchedulableEvent {
        self.bookings
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .expect("unknown booking id")
    }

    pub fn note_count(&self) -> usize {
        self.notes.lock().unwrap().len()
    }

    pub fn notes_for(&self, patient_id: Uuid) -> Vec<ClinicalNote> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.patient_id == patient_id)
            .cloned()
            .collect()
    }

    async fn probe(&self, hit: bool) -> Result<bool, ReconciliationError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.probe_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_probes.load(Ordering::SeqCst) {
            return Err(ReconciliationError::DatabaseError(
                "injected probe failure".to_string(),
            ));
        }

        Ok(hit)
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryStore {
    async fn fetch_candidates(
        &self,
        kind: EventKind,
        cutoff_date: NaiveDate,
    ) -> Result<Vec<SchedulableEvent>, ReconciliationError> {
        let table = match kind {
            EventKind::UrologistAppointment => &self.appointments,
            EventKind::InvestigationBooking => &self.bookings,
        };

        // Mirrors the coarse date-only pre-filter of the real store.
        Ok(table
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status.is_reconcilable() && e.scheduled_date <= cutoff_date)
            .cloned()
            .collect())
    }

    async fn patient_record_updated_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        let hit = self
            .patient_updates
            .lock()
            .unwrap()
            .iter()
            .any(|(id, ts)| *id == patient_id && *ts > after);
        self.probe(hit).await
    }

    async fn clinical_note_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        let hit = self
            .notes
            .lock()
            .unwrap()
            .iter()
            .any(|n| n.patient_id == patient_id && n.created_at > after);
        self.probe(hit).await
    }

    async fn investigation_result_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        let hit = self
            .investigation_results
            .lock()
            .unwrap()
            .iter()
            .any(|(id, ts)| *id == patient_id && *ts > after);
        self.probe(hit).await
    }

    async fn appointment_created_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        let hit = self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.patient_id == patient_id && e.created_at > after);
        self.probe(hit).await
    }

    async fn commit_transitions(
        &self,
        transitions: &[NoShowTransition],
    ) -> Result<(), ReconciliationError> {
        let fail_at = *self.fail_commit_at.lock().unwrap();

        // Stage everything first; an injected failure anywhere in the batch
        // discards the whole stage, mimicking a rolled-back transaction.
        let mut staged_notes = Vec::new();
        for (i, t) in transitions.iter().enumerate() {
            if fail_at == Some(i) {
                return Err(ReconciliationError::DatabaseError(
                    "injected commit failure".to_string(),
                ));
            }
            staged_notes.push(ClinicalNote::no_show(t.patient_id, t.note_content.clone()));
        }

        for t in transitions {
            let table = match t.kind {
                EventKind::UrologistAppointment => &self.appointments,
                EventKind::InvestigationBooking => &self.bookings,
            };
            let mut rows = table.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|e| e.id == t.event_id)
                .expect("transition for unknown event");
            row.status = EventStatus::NoShow;
            row.updated_at = Utc::now();
        }

        self.notes.lock().unwrap().extend(staged_notes);
        Ok(())
    }
}

/// A reconcilable event scheduled at `scheduled`, created a week earlier so
/// its own creation never registers as an activity signal.
pub fn event(patient_id: Uuid, scheduled: DateTime<Utc>, counterparty: &str) -> SchedulableEvent {
    SchedulableEvent {
        id: Uuid::new_v4(),
        patient_id,
        scheduled_date: scheduled.date_naive(),
        scheduled_time: scheduled.time(),
        status: EventStatus::Scheduled,
        counterparty_name: counterparty.to_string(),
        notes: None,
        created_at: scheduled - Duration::days(7),
        updated_at: scheduled - Duration::days(7),
    }
}

pub fn clinical_note(patient_id: Uuid, created_at: DateTime<Utc>) -> ClinicalNote {
    ClinicalNote {
        id: Uuid::new_v4(),
        patient_id,
        note_type: "consultation".to_string(),
        note_content: "Seen in clinic".to_string(),
        author_name: "Dr. Ayers".to_string(),
        author_role: "Urologist".to_string(),
        created_at,
    }
}
