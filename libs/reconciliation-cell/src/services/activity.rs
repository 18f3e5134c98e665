// libs/reconciliation-cell/src/services/activity.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ReconciliationError;
use crate::models::{ActivityOutcome, ActivitySignal};
use crate::services::store::ReconciliationStore;

/// Multi-source "has the patient been seen since" predicate.
///
/// Probes four signal sources in a short-circuiting OR: patient record
/// updates, clinical notes, investigation results, newer appointments. Any
/// probe error resolves to [`ActivityOutcome::CheckFailed`]: a wrongly marked
/// no-show for a patient who attended is worse than a missed no-show, so read
/// failures always presume attendance.
pub struct ActivityDetectionService {
    store: Arc<dyn ReconciliationStore>,
}

impl ActivityDetectionService {
    pub fn new(store: Arc<dyn ReconciliationStore>) -> Self {
        Self { store }
    }

    pub async fn detect(&self, patient_id: Uuid, event_ts: DateTime<Utc>) -> ActivityOutcome {
        let record_update = self
            .store
            .patient_record_updated_after(patient_id, event_ts)
            .await;
        if let Some(outcome) =
            Self::resolve(patient_id, ActivitySignal::PatientRecordUpdated, record_update)
        {
            return outcome;
        }

        let note = self.store.clinical_note_after(patient_id, event_ts).await;
        if let Some(outcome) = Self::resolve(patient_id, ActivitySignal::ClinicalNoteAdded, note) {
            return outcome;
        }

        let result = self
            .store
            .investigation_result_after(patient_id, event_ts)
            .await;
        if let Some(outcome) =
            Self::resolve(patient_id, ActivitySignal::InvestigationResultAdded, result)
        {
            return outcome;
        }

        let rebooked = self
            .store
            .appointment_created_after(patient_id, event_ts)
            .await;
        if let Some(outcome) =
            Self::resolve(patient_id, ActivitySignal::NewAppointmentBooked, rebooked)
        {
            return outcome;
        }

        ActivityOutcome::NoActivity
    }

    /// Collapse one probe result: a hit or an error terminates the chain, a
    /// clean miss moves on to the next source.
    fn resolve(
        patient_id: Uuid,
        signal: ActivitySignal,
        result: Result<bool, ReconciliationError>,
    ) -> Option<ActivityOutcome> {
        match result {
            Ok(true) => {
                debug!("Activity for patient {}: {}", patient_id, signal);
                Some(ActivityOutcome::Activity(signal))
            }
            Ok(false) => None,
            Err(e) => {
                warn!(
                    "Activity check ({}) failed for patient {}: {} - presuming attended",
                    signal, patient_id, e
                );
                Some(ActivityOutcome::CheckFailed)
            }
        }
    }
}
