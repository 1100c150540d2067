pub mod progress;

pub use progress::{logging_sink, ProgressEvent, ProgressSink};
