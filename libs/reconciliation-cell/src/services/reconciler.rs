// libs/reconciliation-cell/src/services/reconciler.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use shared_config::NO_SHOW_LOOKBACK_HOURS;

use crate::error::ReconciliationError;
use crate::models::{
    ActivityOutcome, EventKind, NoShowTransition, RunSummary, SchedulableEvent,
};
use crate::services::activity::ActivityDetectionService;
use crate::services::store::ReconciliationStore;

/// One batch reconciliation pass: select candidates past the cutoff, evaluate
/// the activity predicate for each, then commit every resulting no-show
/// transition as a single atomic batch.
///
/// The read phase (selection + activity probes) fully precedes the write
/// phase; a failure anywhere in the write phase leaves the database unchanged
/// and the next scheduled run re-attempts from scratch.
pub struct NoShowReconciliationService {
    store: Arc<dyn ReconciliationStore>,
    activity: ActivityDetectionService,
}

impl NoShowReconciliationService {
    pub fn new(store: Arc<dyn ReconciliationStore>) -> Self {
        let activity = ActivityDetectionService::new(Arc::clone(&store));
        Self { store, activity }
    }

    pub async fn run(&self) -> Result<RunSummary, ReconciliationError> {
        self.run_at(Utc::now()).await
    }

    /// Run the reconciliation pass against an explicit `now`, so the cutoff
    /// arithmetic is deterministic under test.
    #[instrument(skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary, ReconciliationError> {
        let cutoff = now - Duration::hours(NO_SHOW_LOOKBACK_HOURS);
        info!(
            "Starting no-show reconciliation run (cutoff {})",
            cutoff.to_rfc3339()
        );

        let mut summary = RunSummary::new(now);
        let mut transitions: Vec<NoShowTransition> = Vec::new();

        // Read phase.
        for kind in EventKind::ALL {
            let candidates = self.store.fetch_candidates(kind, cutoff.date_naive()).await?;

            for event in candidates {
                // The store pre-filters by date only; the strict combined
                // date+time comparison happens here. An event scheduled at
                // exactly the cutoff instant is not yet eligible.
                let scheduled_at = event.scheduled_at();
                if scheduled_at >= cutoff {
                    continue;
                }

                let outcome = self.activity.detect(event.patient_id, scheduled_at).await;

                let counts = summary.variant_mut(kind);
                counts.inspected += 1;

                match outcome {
                    ActivityOutcome::Activity(signal) => {
                        debug!(
                            "Skipping {} {} for patient {}: {}",
                            kind, event.id, event.patient_id, signal
                        );
                        counts.presumed_attended += 1;
                    }
                    ActivityOutcome::CheckFailed => {
                        counts.presumed_attended += 1;
                        summary.detection_failures += 1;
                    }
                    ActivityOutcome::NoActivity => {
                        counts.marked_no_show += 1;
                        transitions.push(NoShowTransition {
                            kind,
                            event_id: event.id,
                            patient_id: event.patient_id,
                            note_content: audit_note(kind, &event),
                        });
                    }
                }
            }
        }

        // Write phase: everything or nothing.
        if !transitions.is_empty() {
            self.store.commit_transitions(&transitions).await?;
        }

        summary.finished_at = Some(Utc::now());
        info!(
            "Reconciliation run complete: {} inspected, {} marked no-show \
             (appointments: {}/{}, investigations: {}/{}), {} detection failure(s)",
            summary.total_inspected(),
            summary.total_marked(),
            summary.appointments.marked_no_show,
            summary.appointments.inspected,
            summary.investigations.marked_no_show,
            summary.investigations.inspected,
            summary.detection_failures,
        );

        Ok(summary)
    }
}

/// Human-readable audit entry naming the original scheduled date, time and
/// counterparty, so the timeline stays legible without the event row.
fn audit_note(kind: EventKind, event: &SchedulableEvent) -> String {
    let subject = match kind {
        EventKind::UrologistAppointment => {
            format!("urologist appointment with {}", event.counterparty_name)
        }
        EventKind::InvestigationBooking => {
            format!("investigation booking for {}", event.counterparty_name)
        }
    };

    format!(
        "Patient did not attend {} scheduled on {} at {}. \
         Automatically marked as no-show after {} hours with no recorded patient activity.",
        subject,
        event.scheduled_date,
        event.scheduled_time.format("%H:%M"),
        NO_SHOW_LOOKBACK_HOURS,
    )
}
