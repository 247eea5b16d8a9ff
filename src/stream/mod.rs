// src/stream/mod.rs

//! Streaming batch results: concurrency-limited driving, cancellation and
//! stale-result filtering.

mod cancel;
mod driver;
mod progress;

pub use cancel::{CancelGroup, CancelToken, delayed, delayed_err};
pub use driver::{StreamLimits, StreamOutcome, stream_batches};
pub use progress::{ProgressTracker, SequenceId, Ticket};
