//! Progress reporting for frame sampling.
//!
//! Attach a [`ProgressCallback`] through
//! [`PipelineOptions::with_progress`](crate::PipelineOptions::with_progress)
//! to be told about every frame written to storage.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidpeek::{PipelineOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("saved frame {} ({}/{:?})", info.sequence, info.current, info.total);
//!     }
//! }
//!
//! let options = PipelineOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot taken after a frame was persisted.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames persisted so far.
    pub current: u64,
    /// The frame budget.
    pub total: Option<u64>,
    /// Completion percentage (0.0 to 100.0), if `total` is known and non-zero.
    pub percentage: Option<f32>,
    /// Time since sampling started.
    pub elapsed: Duration,
    /// Estimated time until the budget is reached.
    pub estimated_remaining: Option<Duration>,
    /// Sequence number of the frame just written.
    pub sequence: u64,
    /// Presentation timestamp of that frame, in the stream time base.
    pub pts: Option<i64>,
}

/// Receives progress updates.
///
/// Callbacks observe only; they cannot stop the pipeline.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
}

/// The default callback. Does nothing.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing between reports.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one persisted frame and notify the callback.
    pub(crate) fn advance(&mut self, sequence: u64, pts: Option<i64>) {
        self.current += 1;

        let elapsed = self.start_time.elapsed();
        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32) * 100.0);
        let estimated_remaining = self.total.map(|total| {
            let remaining = total.saturating_sub(self.current);
            elapsed.div_f64(self.current as f64).mul_f64(remaining as f64)
        });

        self.callback.on_progress(&ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            sequence,
            pts,
        });
    }
}
