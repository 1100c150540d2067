pub mod dataset;
pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerSettings};
