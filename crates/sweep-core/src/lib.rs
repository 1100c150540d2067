pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod providers;
pub mod record;
pub mod report;
pub mod review;
pub mod storage;
pub mod template;

pub use engine::{Scheduler, SchedulerSettings};
pub use errors::{ConfigError, ProviderError, RunError, StorageError};
