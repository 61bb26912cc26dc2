//! Pipeline configuration.
//!
//! [`PipelineOptions`] is a builder carrying the frame budget, output
//! location, window title, output resolution, decode-error policy and
//! progress callback. Every setting has a default, so
//! `PipelineOptions::new()` reproduces the stock behaviour: sample five
//! frames into `./frames`, skipping packets that fail to decode.
//!
//! ```no_run
//! use vidpeek::{DecodeErrorPolicy, PipelineOptions};
//!
//! let options = PipelineOptions::new()
//!     .with_frame_budget(10)
//!     .with_output_directory("snapshots")
//!     .with_decode_error_policy(DecodeErrorPolicy::Abort);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::progress::{NoOpProgress, ProgressCallback};

/// Frames persisted before presentation starts, unless configured.
pub const DEFAULT_FRAME_BUDGET: u64 = 5;

/// What the driver does when a packet fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeErrorPolicy {
    /// Log it and carry on with the next packet.
    #[default]
    Skip,
    /// Stop the run and return the error.
    Abort,
}

/// Target size of the pixel buffer.
///
/// When neither side is set the stream's coded size is used. Setting one
/// side together with `maintain_aspect_ratio` derives the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutputSize {
    /// Target width. `None` keeps the source width.
    pub width: Option<u32>,
    /// Target height. `None` keeps the source height.
    pub height: Option<u32>,
    /// Derive the missing side from the source aspect ratio.
    pub maintain_aspect_ratio: bool,
}

impl Default for FrameOutputSize {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            maintain_aspect_ratio: true,
        }
    }
}

impl FrameOutputSize {
    /// Resolve `(width, height)` for a source of the given size.
    pub fn resolve(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if self.maintain_aspect_ratio && source_width > 0 => {
                let ratio = w as f64 / source_width as f64;
                (w, ((source_height as f64 * ratio).round() as u32).max(1))
            }
            (Some(w), None) => (w, source_height),
            (None, Some(h)) if self.maintain_aspect_ratio && source_height > 0 => {
                let ratio = h as f64 / source_height as f64;
                (((source_width as f64 * ratio).round() as u32).max(1), h)
            }
            (None, Some(h)) => (source_width, h),
            (None, None) => (source_width, source_height),
        }
    }
}

/// Settings for a [`Session`](crate::Session).
#[derive(Clone)]
pub struct PipelineOptions {
    pub(crate) frame_budget: u64,
    pub(crate) output_directory: PathBuf,
    pub(crate) file_prefix: String,
    pub(crate) window_title: Option<String>,
    pub(crate) output_size: FrameOutputSize,
    pub(crate) decode_error_policy: DecodeErrorPolicy,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for PipelineOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineOptions")
            .field("frame_budget", &self.frame_budget)
            .field("output_directory", &self.output_directory)
            .field("file_prefix", &self.file_prefix)
            .field("window_title", &self.window_title)
            .field("output_size", &self.output_size)
            .field("decode_error_policy", &self.decode_error_policy)
            .finish_non_exhaustive()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self {
            frame_budget: DEFAULT_FRAME_BUDGET,
            output_directory: PathBuf::from("frames"),
            file_prefix: "frame".to_string(),
            window_title: None,
            output_size: FrameOutputSize::default(),
            decode_error_policy: DecodeErrorPolicy::default(),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Number of frames to persist before presenting. Zero skips decoding.
    #[must_use]
    pub fn with_frame_budget(mut self, frames: u64) -> Self {
        self.frame_budget = frames;
        self
    }

    /// Directory sampled frames are written to.
    #[must_use]
    pub fn with_output_directory<P: AsRef<Path>>(mut self, directory: P) -> Self {
        self.output_directory = directory.as_ref().to_path_buf();
        self
    }

    /// File name prefix for sampled frames.
    #[must_use]
    pub fn with_file_prefix(mut self, prefix: &str) -> Self {
        self.file_prefix = prefix.to_string();
        self
    }

    /// Window title. Defaults to the input file name.
    #[must_use]
    pub fn with_window_title(mut self, title: &str) -> Self {
        self.window_title = Some(title.to_string());
        self
    }

    /// Override the output resolution. `None` keeps the source value.
    #[must_use]
    pub fn with_resolution(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.output_size.width = width;
        self.output_size.height = height;
        self
    }

    /// Whether a single configured side keeps the source aspect ratio.
    #[must_use]
    pub fn with_maintain_aspect_ratio(mut self, maintain: bool) -> Self {
        self.output_size.maintain_aspect_ratio = maintain;
        self
    }

    #[must_use]
    pub fn with_decode_error_policy(mut self, policy: DecodeErrorPolicy) -> Self {
        self.decode_error_policy = policy;
        self
    }

    /// Receive a callback after each persisted frame.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    pub fn frame_budget(&self) -> u64 {
        self.frame_budget
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    pub fn decode_error_policy(&self) -> DecodeErrorPolicy {
        self.decode_error_policy
    }

    pub fn output_size(&self) -> FrameOutputSize {
        self.output_size
    }
}
