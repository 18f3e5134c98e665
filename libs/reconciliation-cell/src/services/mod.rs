pub mod store;
pub mod activity;
pub mod reconciler;
pub mod scheduler;

pub use store::{ReconciliationStore, SupabaseStore};
pub use activity::ActivityDetectionService;
pub use reconciler::NoShowReconciliationService;
pub use scheduler::ReconciliationScheduler;
