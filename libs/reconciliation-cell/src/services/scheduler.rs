// libs/reconciliation-cell/src/services/scheduler.rs
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Timelike, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn, instrument};

use shared_config::RUN_TIMEOUT_SECONDS;

use crate::error::ReconciliationError;
use crate::services::reconciler::NoShowReconciliationService;
use crate::status::{SchedulerStatus, SchedulerStatusHandle};

const SHUTDOWN_POLL_INTERVAL: StdDuration = StdDuration::from_millis(100);

/// Owns the reconciliation cadence: one run immediately at startup to cover
/// downtime gaps, then one run at the top of every hour. Every run error is
/// absorbed and logged here so a failed run never unschedules future ticks.
pub struct ReconciliationScheduler {
    reconciler: Arc<NoShowReconciliationService>,
    run_lock: Mutex<()>,
    is_shutdown: RwLock<bool>,
    status: SchedulerStatusHandle,
}

impl ReconciliationScheduler {
    pub fn new(reconciler: Arc<NoShowReconciliationService>) -> Self {
        Self {
            reconciler,
            run_lock: Mutex::new(()),
            is_shutdown: RwLock::new(false),
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
        }
    }

    /// Shared view of the scheduler's run history for the ops endpoints.
    pub fn status_handle(&self) -> SchedulerStatusHandle {
        Arc::clone(&self.status)
    }

    #[instrument(skip(self))]
    pub async fn start(&self) {
        info!("Starting no-show reconciliation scheduler");

        // Catch-up run for anything that went stale while the process was down.
        // Run errors are logged and recorded in the status inside run_once;
        // nothing here may escape the loop.
        let _ = self.run_once().await;

        loop {
            if !self.sleep_until_next_tick().await {
                break;
            }
            let _ = self.run_once().await;
        }

        info!("Reconciliation scheduler stopped");
    }

    pub async fn shutdown(&self) {
        info!("Initiating reconciliation scheduler shutdown");
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }

    /// Execute one guarded reconciliation run. At most one run may be in
    /// flight at a time; a tick that finds a run still executing is skipped
    /// rather than queued, and the skip is recorded in the status.
    pub async fn run_once(&self) -> Result<(), ReconciliationError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Previous reconciliation run still in progress, skipping this tick");
            let mut status = self.status.write().await;
            status.runs_skipped += 1;
            return Err(ReconciliationError::RunInProgress);
        };

        let started_at = Utc::now();
        let result = timeout(
            StdDuration::from_secs(RUN_TIMEOUT_SECONDS),
            self.reconciler.run(),
        )
        .await;

        let mut status = self.status.write().await;
        status.last_run_at = Some(started_at);

        match result {
            Ok(Ok(summary)) => {
                status.runs_completed += 1;
                status.last_summary = Some(summary);
                status.last_error = None;
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Reconciliation run failed, will retry on next tick: {}", e);
                status.runs_failed += 1;
                status.last_error = Some(e.to_string());
                Err(e)
            }
            Err(_) => {
                let e = ReconciliationError::RunTimeout {
                    timeout_seconds: RUN_TIMEOUT_SECONDS,
                };
                error!("{}, abandoning the run", e);
                status.runs_failed += 1;
                status.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Sleep until the next top-of-hour tick, waking periodically to observe
    /// shutdown. Returns false once shutdown has been requested.
    async fn sleep_until_next_tick(&self) -> bool {
        let wait = duration_until_next_hour(Utc::now());
        debug!("Next reconciliation tick in {:?}", wait);
        let deadline = Instant::now() + wait;

        loop {
            if *self.is_shutdown.read().await {
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                return true;
            }

            let remaining = deadline - now;
            tokio::time::sleep(remaining.min(SHUTDOWN_POLL_INTERVAL)).await;
        }
    }
}

/// Time left until the next wall-clock hour boundary (minute 0, second 0).
pub fn duration_until_next_hour(now: DateTime<Utc>) -> StdDuration {
    let next = (now + Duration::hours(1))
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now + Duration::hours(1));

    (next - now)
        .to_std()
        .unwrap_or(StdDuration::from_secs(3600))
}
