use axum::{
    Json, Router,
    extract::State,
    routing::get,
};

use reconciliation_cell::status::{SchedulerStatus, SchedulerStatusHandle};

pub fn create_router(status: SchedulerStatusHandle) -> Router {
    Router::new()
        .route("/", get(|| async { "Urology reconciliation worker is running!" }))
        .route("/status", get(scheduler_status))
        .with_state(status)
}

async fn scheduler_status(State(status): State<SchedulerStatusHandle>) -> Json<SchedulerStatus> {
    Json(status.read().await.clone())
}
