//! In-flight run progress. The scheduler reports after every finished item,
//! in completion order.

use std::sync::Arc;

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn is_last(&self) -> bool {
        self.done >= self.total
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.done.min(self.total) * 100) / self.total) as u8
    }
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Sink that logs every `every`-th item and the final one.
pub fn logging_sink(every: usize) -> ProgressSink {
    let every = every.max(1);
    Arc::new(move |ev: ProgressEvent| {
        if ev.done % every == 0 || ev.is_last() {
            info!(done = ev.done, total = ev.total, percent = ev.percent(), "progress");
        }
    })
}
