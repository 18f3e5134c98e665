pub mod models;
pub mod services;
pub mod error;
pub mod status;

pub use models::*;
pub use error::*;
pub use services::*;
pub use status::{SchedulerStatus, SchedulerStatusHandle};
