use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use reconciliation_cell::services::{
    NoShowReconciliationService, ReconciliationScheduler, SupabaseStore,
};
use reconciliation_cell::services::store::ReconciliationStore;
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting urology no-show reconciliation worker");

    // Load configuration
    let config = AppConfig::from_env();
    let worker_port = config.worker_port;

    // Wire up the reconciliation pipeline
    let store: Arc<dyn ReconciliationStore> = Arc::new(SupabaseStore::new(&config));
    let reconciler = Arc::new(NoShowReconciliationService::new(store));
    let scheduler = Arc::new(ReconciliationScheduler::new(reconciler));
    let status = scheduler.status_handle();

    // Run the scheduler loop in the background
    let scheduler_task = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            scheduler.start().await;
        })
    };

    // Build the operational router
    let app = router::create_router(status).layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
            .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
    );

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], worker_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown({
            let scheduler = Arc::clone(&scheduler);
            async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
                scheduler.shutdown().await;
            }
        })
        .await
        .unwrap();

    let _ = scheduler_task.await;
    info!("Worker stopped");
}
