use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::RunSummary;

pub type SchedulerStatusHandle = Arc<RwLock<SchedulerStatus>>;

/// Operational snapshot published by the scheduler after every tick, served
/// as-is on the worker's `/status` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub runs_skipped: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_summary: Option<RunSummary>,
    pub last_error: Option<String>,
}
