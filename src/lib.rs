//! # vidpeek
//!
//! Decode the first frames of a video, save them as PPM images, and show the
//! last one in a window.
//!
//! The pipeline is built from small pieces that each sit behind a trait, so
//! any of them can be swapped out:
//!
//! - [`Demuxer`] ([`PacketSource`]) reads compressed packets from a container.
//! - [`VideoDecoder`] ([`FrameDecoder`]) turns packets into frames, exposing
//!   the decoder's look-ahead buffering as an explicit state machine.
//! - [`FrameConverter`] rescales any decoded frame into a fixed-size RGB24
//!   [`PixelBuffer`].
//! - [`PpmDirectory`] ([`FrameStore`]) writes sampled frames to disk.
//! - [`WindowPresenter`] ([`Presenter`]) shows a [`PixelBuffer`] on screen.
//! - [`Session`] wires them together and owns their lifetimes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidpeek::{MediaSession, PipelineOptions};
//!
//! let options = PipelineOptions::new().with_frame_budget(5);
//! let session = MediaSession::open("input.mp4", options).unwrap();
//! let summary = session.run().unwrap();
//! println!("{} frame(s) written", summary.sampling.frames_sampled);
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed, as for any
//! `ffmpeg-next` based crate.

mod conversion;
pub mod decoder;
pub mod demux;
pub mod error;
pub mod ffmpeg;
pub mod metadata;
pub mod options;
pub mod pipeline;
mod pixel_buffer;
pub mod presenter;
pub mod progress;
pub mod store;

pub use conversion::FrameConverter;
pub use decoder::{
    DecodedFrame, FrameDecoder, ReceiveOutcome, SubmitOutcome, VideoDecoder, drain_and_discard,
};
pub use demux::{Demuxer, PacketSource, Packets};
pub use error::{ErrorCategory, VidpeekError};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use metadata::{StreamHandle, StreamKind};
pub use options::{DEFAULT_FRAME_BUDGET, DecodeErrorPolicy, FrameOutputSize, PipelineOptions};
pub use pipeline::{
    MediaSession, RunSummary, SampleSummary, Session, StopReason, present_until_closed,
};
pub use pixel_buffer::PixelBuffer;
pub use presenter::{DisplaySurface, Presenter, PresenterEvent, WindowPresenter};
pub use progress::{ProgressCallback, ProgressInfo};
pub use store::{FrameStore, PpmDirectory};
