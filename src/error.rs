//! Error types for the `vidpeek` crate.
//!
//! [`VidpeekError`] is returned by every fallible operation. Each variant
//! belongs to one [`ErrorCategory`], which is what the pipeline driver looks
//! at when it decides between skipping a packet and aborting the run.

use std::{fmt::Display, io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `vidpeek` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VidpeekError {
    /// The container could not be opened or its decoder could not be set up.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::Demuxer::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The container has no video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A pixel buffer or surface was requested with a zero dimension.
    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Reading the next packet from the container failed.
    #[error("Failed to read packet: {0}")]
    PacketRead(String),

    /// A packet could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// A packet was submitted after the decoder was flushed.
    #[error("Decoder has been flushed and no longer accepts packets")]
    DecoderFlushed,

    /// The decoded frame uses a pixel format the scaler cannot read.
    #[error("Unsupported source pixel format: {0}")]
    UnsupportedPixelFormat(String),

    /// The scaler failed on a frame it accepted.
    #[error("Frame conversion failed: {0}")]
    Conversion(String),

    /// A sampled frame could not be written to storage.
    #[error("Failed to write frame {sequence} to {path}: {reason}")]
    FramePersist {
        /// Sequence number of the sampled frame.
        sequence: u64,
        /// Destination file.
        path: PathBuf,
        /// Underlying reason the write failed.
        reason: String,
    },

    /// An I/O error occurred while preparing output storage.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// The display window could not be created.
    #[error("Failed to open display: {0}")]
    DisplayOpen(String),

    /// Pushing the surface to the window failed.
    #[error("Failed to present frame: {0}")]
    DisplayUpdate(String),

    /// A pixel buffer did not match the display surface it was copied into.
    #[error(
        "Pixel buffer is {buffer_width}x{buffer_height} but the surface is {surface_width}x{surface_height}"
    )]
    SurfaceMismatch {
        /// Width of the surface.
        surface_width: usize,
        /// Height of the surface.
        surface_height: usize,
        /// Width of the offending buffer.
        buffer_width: u32,
        /// Height of the offending buffer.
        buffer_height: u32,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

/// Coarse classification of a [`VidpeekError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Container, decoder, or buffer initialisation. Fatal before any work.
    Open,
    /// Mid-stream demux failure. Treated as end of stream.
    Read,
    /// A single packet failed to decode. May be skipped.
    Decode,
    /// Pixel format conversion failure. Fatal.
    Convert,
    /// Writing a sampled frame failed. Fatal.
    Persist,
    /// Window creation or presentation failure. Fatal.
    Display,
    /// Anything raised directly by FFmpeg outside the above.
    Other,
}

impl VidpeekError {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            VidpeekError::FileOpen { .. }
            | VidpeekError::NoVideoStream
            | VidpeekError::InvalidDimensions { .. } => ErrorCategory::Open,
            VidpeekError::PacketRead(_) => ErrorCategory::Read,
            VidpeekError::VideoDecodeError(_) | VidpeekError::DecoderFlushed => {
                ErrorCategory::Decode
            }
            VidpeekError::UnsupportedPixelFormat(_) | VidpeekError::Conversion(_) => {
                ErrorCategory::Convert
            }
            VidpeekError::FramePersist { .. } | VidpeekError::IoError(_) => ErrorCategory::Persist,
            VidpeekError::DisplayOpen(_)
            | VidpeekError::DisplayUpdate(_)
            | VidpeekError::SurfaceMismatch { .. } => ErrorCategory::Display,
            VidpeekError::FfmpegError(_) => ErrorCategory::Other,
        }
    }

    /// Whether the driver may skip past this error and keep reading packets.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Decode | ErrorCategory::Read)
    }
}

impl From<FfmpegError> for VidpeekError {
    fn from(error: FfmpegError) -> Self {
        VidpeekError::FfmpegError(error.to_string())
    }
}

impl VidpeekError {
    pub(crate) fn persist(sequence: u64, path: PathBuf, error: impl Display) -> Self {
        VidpeekError::FramePersist {
            sequence,
            path,
            reason: error.to_string(),
        }
    }
}
