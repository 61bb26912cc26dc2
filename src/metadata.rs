//! Stream metadata.
//!
//! A [`StreamHandle`] is built for every stream when a
//! [`Demuxer`](crate::Demuxer) opens a container and never changes afterwards.
//! Packets refer back to their stream through [`StreamHandle::index`].

use ffmpeg_next::{Rational, format::Pixel, media::Type};

/// The kind of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Video frames.
    Video,
    /// Audio samples.
    Audio,
    /// Subtitles.
    Subtitle,
    /// Opaque data (timecodes, metadata tracks).
    Data,
    /// Attached files such as fonts.
    Attachment,
    /// Anything FFmpeg could not classify.
    Unknown,
}

impl From<Type> for StreamKind {
    fn from(medium: Type) -> Self {
        match medium {
            Type::Video => StreamKind::Video,
            Type::Audio => StreamKind::Audio,
            Type::Subtitle => StreamKind::Subtitle,
            Type::Data => StreamKind::Data,
            Type::Attachment => StreamKind::Attachment,
            Type::Unknown => StreamKind::Unknown,
        }
    }
}

/// Identifies one elementary stream in an opened container.
///
/// Width, height and pixel format are the coded values from the stream's
/// codec parameters; they are zero / [`Pixel::None`] for non-video streams.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct StreamHandle {
    /// Index of the stream within the container.
    pub index: usize,
    /// What the stream carries.
    pub kind: StreamKind,
    /// Coded frame width in pixels.
    pub width: u32,
    /// Coded frame height in pixels.
    pub height: u32,
    /// Coded pixel format.
    pub pixel_format: Pixel,
    /// Codec name (e.g. `"h264"`), or `"unknown"`.
    pub codec: String,
    /// Time base the stream's timestamps are expressed in.
    pub time_base: Rational,
    /// Average frames per second, `0.0` when the container does not say.
    pub frames_per_second: f64,
}

impl StreamHandle {
    /// Whether this is a video stream.
    pub fn is_video(&self) -> bool {
        self.kind == StreamKind::Video
    }

    /// Convert a timestamp in this stream's time base to seconds.
    pub fn pts_to_seconds(&self, pts: i64) -> f64 {
        let denominator = self.time_base.denominator().max(1);
        pts as f64 * self.time_base.numerator() as f64 / denominator as f64
    }
}
