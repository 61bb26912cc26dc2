//! Container demuxing.
//!
//! [`Demuxer`] opens a media file, describes its streams, selects the best
//! video stream, and hands out compressed packets one at a time in container
//! order. Packets of every stream are returned; picking out the video stream
//! is the caller's job.
//!
//! # Example
//!
//! ```no_run
//! use vidpeek::{Demuxer, PacketSource, VidpeekError};
//!
//! let mut demuxer = Demuxer::open("input.mp4")?;
//! let video = demuxer.video_stream().index;
//! while let Some(packet) = demuxer.next_packet()? {
//!     if packet.stream() == video {
//!         println!("video packet, pts {:?}", packet.pts());
//!     }
//! }
//! # Ok::<(), VidpeekError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Stream, codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    media::Type,
};

use crate::{
    decoder::VideoDecoder,
    error::VidpeekError,
    metadata::{StreamHandle, StreamKind},
};

/// A lazy, finite source of compressed packets.
///
/// `Ok(None)` marks the end of the stream. Implementations keep an internal
/// read cursor, so `next_packet` takes `&mut self`.
pub trait PacketSource {
    /// Read the next packet in container order.
    fn next_packet(&mut self) -> Result<Option<Packet>, VidpeekError>;
}

/// An opened container.
pub struct Demuxer {
    input_context: Input,
    streams: Vec<StreamHandle>,
    video_stream_index: usize,
    path: PathBuf,
    finished: bool,
}

impl Debug for Demuxer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Demuxer")
            .field("path", &self.path)
            .field("streams", &self.streams)
            .field("video_stream_index", &self.video_stream_index)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Demuxer {
    /// Open a container and locate its best video stream.
    ///
    /// # Errors
    ///
    /// [`VidpeekError::FileOpen`] if the file cannot be opened, and
    /// [`VidpeekError::NoVideoStream`] if there is no video stream at all.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VidpeekError> {
        let path = path.as_ref();
        log::debug!("Opening container: {}", path.display());

        crate::ffmpeg::initialize(path)?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| VidpeekError::FileOpen {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?;

        let streams = input_context
            .streams()
            .map(|stream| describe_stream(&stream, path))
            .collect::<Vec<_>>();

        let video_stream_index = input_context
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index())
            .or_else(|| streams.iter().find(|s| s.is_video()).map(|s| s.index))
            .ok_or(VidpeekError::NoVideoStream)?;

        log::debug!(
            "Container {} has {} stream(s); using video stream {video_stream_index}",
            input_context.format().name(),
            streams.len(),
        );

        Ok(Self {
            input_context,
            streams,
            video_stream_index,
            path: path.to_path_buf(),
            finished: false,
        })
    }

    /// Every stream in the container, indexed by stream index.
    pub fn streams(&self) -> &[StreamHandle] {
        &self.streams
    }

    /// The selected video stream.
    pub fn video_stream(&self) -> &StreamHandle {
        &self.streams[self.video_stream_index]
    }

    /// Path the container was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a decoder for the selected video stream.
    ///
    /// # Errors
    ///
    /// [`VidpeekError::FileOpen`] if FFmpeg has no decoder for the codec.
    pub fn decoder(&self) -> Result<VideoDecoder, VidpeekError> {
        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or(VidpeekError::NoVideoStream)?;
        let decoder = open_video_decoder(&stream, &self.path)?;
        Ok(VideoDecoder::new(decoder, self.video_stream().clone()))
    }

    /// Iterate over the remaining packets.
    ///
    /// The iterator stops after the first read error.
    pub fn packets(&mut self) -> Packets<'_> {
        Packets {
            demuxer: self,
            done: false,
        }
    }
}

impl PacketSource for Demuxer {
    fn next_packet(&mut self) -> Result<Option<Packet>, VidpeekError> {
        if self.finished {
            return Ok(None);
        }

        let mut packet = Packet::empty();
        match packet.read(&mut self.input_context) {
            Ok(()) => Ok(Some(packet)),
            Err(FfmpegError::Eof) => {
                log::debug!("Reached end of {}", self.path.display());
                self.finished = true;
                Ok(None)
            }
            Err(error) => Err(VidpeekError::PacketRead(error.to_string())),
        }
    }
}

/// Iterator returned by [`Demuxer::packets`].
pub struct Packets<'a> {
    demuxer: &'a mut Demuxer,
    done: bool,
}

impl Iterator for Packets<'_> {
    type Item = Result<Packet, VidpeekError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.demuxer.next_packet() {
            Ok(Some(packet)) => Some(Ok(packet)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

fn open_video_decoder(
    stream: &Stream<'_>,
    path: &Path,
) -> Result<ffmpeg_next::decoder::Video, VidpeekError> {
    let index = stream.index();
    let context = CodecContext::from_parameters(stream.parameters()).map_err(|error| {
        VidpeekError::FileOpen {
            path: path.to_path_buf(),
            reason: format!("Failed to read codec parameters for stream {index}: {error}"),
        }
    })?;
    context
        .decoder()
        .video()
        .map_err(|error| VidpeekError::FileOpen {
            path: path.to_path_buf(),
            reason: format!("Failed to create video decoder for stream {index}: {error}"),
        })
}

fn describe_stream(stream: &Stream<'_>, path: &Path) -> StreamHandle {
    let parameters = stream.parameters();
    let kind = StreamKind::from(parameters.medium());
    let codec = match parameters.id().name() {
        "" => "unknown".to_string(),
        name => name.to_string(),
    };

    let (width, height, pixel_format) = if kind == StreamKind::Video {
        match open_video_decoder(stream, path) {
            Ok(decoder) => (decoder.width(), decoder.height(), decoder.format()),
            Err(error) => {
                log::warn!("Cannot describe video stream {}: {error}", stream.index());
                (0, 0, Pixel::None)
            }
        }
    } else {
        (0, 0, Pixel::None)
    };

    let frame_rate = stream.avg_frame_rate();
    let frames_per_second = if frame_rate.denominator() != 0 {
        frame_rate.numerator() as f64 / frame_rate.denominator() as f64
    } else {
        0.0
    };

    StreamHandle {
        index: stream.index(),
        kind,
        width,
        height,
        pixel_format,
        codec,
        time_base: stream.time_base(),
        frames_per_second,
    }
}
