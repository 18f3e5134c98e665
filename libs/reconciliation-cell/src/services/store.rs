// libs/reconciliation-cell/src/services/store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ReconciliationError;
use crate::models::{EventKind, NoShowTransition, SchedulableEvent};

/// Data-store contract the reconciliation job runs against. The reads feed
/// candidate selection and the activity probes; `commit_transitions` is the
/// single all-or-nothing write phase of a run.
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    /// Events of one variant still in a reconcilable status, pre-filtered to
    /// `scheduled_date <= cutoff_date`. The filter is deliberately coarse
    /// (date-only); the caller applies the strict combined date+time cutoff.
    async fn fetch_candidates(
        &self,
        kind: EventKind,
        cutoff_date: NaiveDate,
    ) -> Result<Vec<SchedulableEvent>, ReconciliationError>;

    /// Did any field of the patient's record change after `after`?
    async fn patient_record_updated_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError>;

    /// Was any clinical note written for the patient after `after`?
    async fn clinical_note_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError>;

    /// Was any investigation result filed for the patient after `after`?
    async fn investigation_result_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError>;

    /// Was any new appointment created for the patient after `after`? A later
    /// booking implies the patient was seen and rescheduled.
    async fn appointment_created_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError>;

    /// Apply every transition in the batch, or none of them. Each transition
    /// flips the event to `no_show`, bumps its `updated_at` and inserts one
    /// system-authored `no_show` clinical note.
    async fn commit_transitions(
        &self,
        transitions: &[NoShowTransition],
    ) -> Result<(), ReconciliationError>;
}

// ==============================================================================
// SUPABASE IMPLEMENTATION
// ==============================================================================

/// PostgREST-backed store. Reads are plain filtered GETs; the write phase is
/// one RPC call to `apply_no_show_transitions`, which PostgREST executes in a
/// single database transaction.
pub struct SupabaseStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    fn timestamp(after: DateTime<Utc>) -> String {
        after.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    async fn exists_after(
        &self,
        table: &str,
        column: &str,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        let filters = format!(
            "patient_id=eq.{}&{}=gt.{}",
            patient_id,
            column,
            Self::timestamp(after)
        );

        self.supabase
            .exists(table, &filters)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl ReconciliationStore for SupabaseStore {
    async fn fetch_candidates(
        &self,
        kind: EventKind,
        cutoff_date: NaiveDate,
    ) -> Result<Vec<SchedulableEvent>, ReconciliationError> {
        let filters = format!(
            "status=in.(scheduled,confirmed)&scheduled_date=lte.{}&order=scheduled_date.asc,scheduled_time.asc",
            cutoff_date
        );

        let events: Vec<SchedulableEvent> = self
            .supabase
            .select(kind.table(), &filters)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;

        debug!(
            "Fetched {} candidate {}(s) on or before {}",
            events.len(),
            kind,
            cutoff_date
        );

        Ok(events)
    }

    async fn patient_record_updated_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        let filters = format!(
            "id=eq.{}&updated_at=gt.{}",
            patient_id,
            Self::timestamp(after)
        );

        self.supabase
            .exists("patients", &filters)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))
    }

    async fn clinical_note_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        self.exists_after("clinical_notes", "created_at", patient_id, after)
            .await
    }

    async fn investigation_result_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        self.exists_after("investigation_results", "created_at", patient_id, after)
            .await
    }

    async fn appointment_created_after(
        &self,
        patient_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<bool, ReconciliationError> {
        self.exists_after("urologist_appointments", "created_at", patient_id, after)
            .await
    }

    async fn commit_transitions(
        &self,
        transitions: &[NoShowTransition],
    ) -> Result<(), ReconciliationError> {
        if transitions.is_empty() {
            return Ok(());
        }

        let payload = json!({ "transitions": serde_json::to_value(transitions)? });

        let marked: Value = self
            .supabase
            .rpc("apply_no_show_transitions", payload)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;

        info!(
            "Committed {} no-show transition(s) (server reported {})",
            transitions.len(),
            marked
        );

        Ok(())
    }
}
