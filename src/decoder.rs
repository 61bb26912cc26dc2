//! Packet-to-frame decoding.
//!
//! A decoder may need several packets before it can emit a frame, and after
//! B-frame reordering a single packet may release more than one. The
//! [`FrameDecoder`] contract makes that explicit:
//!
//! 1. [`submit`](FrameDecoder::submit) one packet.
//! 2. Call [`receive_frame`](FrameDecoder::receive_frame) until it returns
//!    [`ReceiveOutcome::WouldBlock`], consuming each frame before asking for
//!    the next.
//! 3. At end of input, [`flush`](FrameDecoder::flush) and keep receiving
//!    until [`ReceiveOutcome::EndOfStream`].
//!
//! A [`DecodedFrame`] borrows the decoder, so the borrow checker rejects any
//! attempt to hold on to it across the next decoder call.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use ffmpeg_next::{
    Error as FfmpegError, Packet, decoder::Video as FfmpegVideoDecoder, format::Pixel,
    frame::Video as VideoFrame, util::error::EAGAIN,
};

use crate::{error::VidpeekError, metadata::StreamHandle};

/// Result of handing a packet to a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The packet was taken. Frames may or may not be ready.
    Accepted,
    /// The decoder still holds undelivered frames and did not take the packet.
    /// Drain it with `receive_frame` and submit the same packet again.
    Busy,
}

/// Result of asking a decoder for a frame.
#[derive(Debug)]
pub enum ReceiveOutcome<'a> {
    /// One decoded frame, valid until the next call on the decoder.
    Frame(DecodedFrame<'a>),
    /// The decoder needs another packet before it can produce more output.
    WouldBlock,
    /// The decoder was flushed and every buffered frame has been delivered.
    EndOfStream,
}

/// A decoded picture in the decoder's native pixel format.
///
/// This is a view into storage owned by the decoder and is only valid until
/// the decoder is called again.
#[derive(Clone, Copy)]
pub struct DecodedFrame<'a> {
    frame: &'a VideoFrame,
}

impl<'a> DecodedFrame<'a> {
    /// Wrap a frame owned by a decoder.
    pub fn new(frame: &'a VideoFrame) -> Self {
        Self { frame }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Native pixel format.
    pub fn format(&self) -> Pixel {
        self.frame.format()
    }

    /// Presentation timestamp in the stream time base.
    pub fn pts(&self) -> Option<i64> {
        self.frame.pts()
    }

    /// The underlying FFmpeg frame.
    pub fn as_video_frame(&self) -> &'a VideoFrame {
        self.frame
    }
}

impl Debug for DecodedFrame<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DecodedFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .field("pts", &self.pts())
            .finish()
    }
}

/// Turns the packets of one stream into decoded frames.
pub trait FrameDecoder {
    /// Hand one packet to the decoder.
    ///
    /// # Errors
    ///
    /// [`VidpeekError::VideoDecodeError`] for a packet the decoder rejects
    /// (recoverable), [`VidpeekError::DecoderFlushed`] after [`flush`](Self::flush).
    fn submit(&mut self, packet: &Packet) -> Result<SubmitOutcome, VidpeekError>;

    /// Fetch the next decoded frame, if one is ready.
    ///
    /// Calling this without a preceding submit returns
    /// [`ReceiveOutcome::WouldBlock`].
    fn receive_frame(&mut self) -> Result<ReceiveOutcome<'_>, VidpeekError>;

    /// Signal end of input. Buffered frames stay available through
    /// [`receive_frame`](Self::receive_frame). Calling it twice is a no-op.
    fn flush(&mut self) -> Result<(), VidpeekError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Waiting for a packet.
    Idle,
    /// A packet was accepted; frames may be pending.
    Draining,
    /// End of input was signalled; delivering what is left.
    Flushing,
    /// Everything was delivered. Terminal.
    Finished,
}

/// FFmpeg-backed [`FrameDecoder`] for a single video stream.
///
/// Obtained from [`Demuxer::decoder`](crate::Demuxer::decoder).
pub struct VideoDecoder {
    decoder: FfmpegVideoDecoder,
    stream: StreamHandle,
    frame: VideoFrame,
    state: DecoderState,
    frames_decoded: u64,
}

impl Debug for VideoDecoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoDecoder")
            .field("stream", &self.stream.index)
            .field("state", &self.state)
            .field("frames_decoded", &self.frames_decoded)
            .finish_non_exhaustive()
    }
}

impl VideoDecoder {
    pub(crate) fn new(decoder: FfmpegVideoDecoder, stream: StreamHandle) -> Self {
        log::debug!(
            "Created {} decoder for stream {} ({}x{} {:?})",
            stream.codec,
            stream.index,
            stream.width,
            stream.height,
            stream.pixel_format,
        );
        Self {
            decoder,
            stream,
            frame: VideoFrame::empty(),
            state: DecoderState::Idle,
            frames_decoded: 0,
        }
    }

    /// The stream this decoder was built for.
    pub fn stream(&self) -> &StreamHandle {
        &self.stream
    }

    /// Number of frames delivered so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Whether the decoder has delivered its last frame after a flush.
    pub fn is_finished(&self) -> bool {
        self.state == DecoderState::Finished
    }
}

impl FrameDecoder for VideoDecoder {
    fn submit(&mut self, packet: &Packet) -> Result<SubmitOutcome, VidpeekError> {
        match self.state {
            DecoderState::Flushing | DecoderState::Finished => {
                return Err(VidpeekError::DecoderFlushed);
            }
            DecoderState::Idle | DecoderState::Draining => {}
        }

        match self.decoder.send_packet(packet) {
            Ok(()) => {
                self.state = DecoderState::Draining;
                Ok(SubmitOutcome::Accepted)
            }
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => {
                self.state = DecoderState::Draining;
                Ok(SubmitOutcome::Busy)
            }
            Err(error) => Err(VidpeekError::VideoDecodeError(error.to_string())),
        }
    }

    fn receive_frame(&mut self) -> Result<ReceiveOutcome<'_>, VidpeekError> {
        match self.state {
            DecoderState::Idle => return Ok(ReceiveOutcome::WouldBlock),
            DecoderState::Finished => return Ok(ReceiveOutcome::EndOfStream),
            DecoderState::Draining | DecoderState::Flushing => {}
        }

        match self.decoder.receive_frame(&mut self.frame) {
            Ok(()) => {
                self.frames_decoded += 1;
                Ok(ReceiveOutcome::Frame(DecodedFrame::new(&self.frame)))
            }
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => {
                if self.state == DecoderState::Flushing {
                    // Nothing more can arrive once input has ended.
                    self.state = DecoderState::Finished;
                    Ok(ReceiveOutcome::EndOfStream)
                } else {
                    self.state = DecoderState::Idle;
                    Ok(ReceiveOutcome::WouldBlock)
                }
            }
            Err(FfmpegError::Eof) => {
                log::debug!(
                    "Decoder for stream {} drained after {} frame(s)",
                    self.stream.index,
                    self.frames_decoded,
                );
                self.state = DecoderState::Finished;
                Ok(ReceiveOutcome::EndOfStream)
            }
            Err(error) => {
                if self.state == DecoderState::Draining {
                    self.state = DecoderState::Idle;
                }
                Err(VidpeekError::VideoDecodeError(error.to_string()))
            }
        }
    }

    fn flush(&mut self) -> Result<(), VidpeekError> {
        match self.state {
            DecoderState::Flushing | DecoderState::Finished => Ok(()),
            DecoderState::Idle | DecoderState::Draining => {
                self.decoder
                    .send_eof()
                    .map_err(|error| VidpeekError::VideoDecodeError(error.to_string()))?;
                self.state = DecoderState::Flushing;
                Ok(())
            }
        }
    }
}

/// Flush `decoder` and discard every frame it still holds.
///
/// Returns how many frames were dropped. Errors while draining end the
/// drain early; they are logged rather than returned.
pub fn drain_and_discard<D: FrameDecoder + ?Sized>(decoder: &mut D) -> u64 {
    if let Err(error) = decoder.flush() {
        log::warn!("Failed to flush decoder: {error}");
        return 0;
    }

    let mut discarded = 0;
    loop {
        match decoder.receive_frame() {
            Ok(ReceiveOutcome::Frame(_)) => discarded += 1,
            Ok(ReceiveOutcome::EndOfStream | ReceiveOutcome::WouldBlock) => break,
            Err(error) => {
                log::warn!("Error while draining decoder: {error}");
                break;
            }
        }
    }
    discarded
}
