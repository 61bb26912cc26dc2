//! The decode, sample and present driver.
//!
//! A [`Session`] owns every resource the pipeline needs and runs it in two
//! strictly sequential phases:
//!
//! 1. **Sampling** ([`Session::sample`]): read packets, keep the selected
//!    video stream, decode, convert each frame into the shared
//!    [`PixelBuffer`], and persist the first `N` conversions.
//! 2. **Presentation** ([`Session::present`]): show the last converted frame
//!    until the user closes the window.
//!
//! Teardown flushes the decoder and releases the frame store, presenter,
//! pixel buffer, decoder and packet source, in that order. It runs from
//! [`Drop`], so it happens on every exit path including errors.
//!
//! # Example
//!
//! ```no_run
//! use vidpeek::{MediaSession, PipelineOptions, VidpeekError};
//!
//! let session = MediaSession::open("input.mp4", PipelineOptions::new())?;
//! let summary = session.run()?;
//! println!("saved {} frame(s)", summary.sampling.frames_sampled);
//! # Ok::<(), VidpeekError>(())
//! ```

use std::path::Path;

use ffmpeg_next::Packet;

use crate::{
    conversion::FrameConverter,
    decoder::{FrameDecoder, ReceiveOutcome, SubmitOutcome, VideoDecoder, drain_and_discard},
    demux::{Demuxer, PacketSource},
    error::{ErrorCategory, VidpeekError},
    options::{DecodeErrorPolicy, PipelineOptions},
    pixel_buffer::PixelBuffer,
    presenter::{Presenter, PresenterEvent, WindowPresenter},
    progress::ProgressTracker,
    store::{FrameStore, PpmDirectory},
};

/// Why the sampling phase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The frame budget was filled. Remaining packets were not read.
    BudgetReached,
    /// The packet source ran out.
    #[default]
    EndOfStream,
    /// Reading a packet failed; handled like end of stream.
    ReadError,
}

/// Counters from the sampling phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct SampleSummary {
    /// Packets read from the source, any stream.
    pub packets_read: u64,
    /// Packets that belonged to another stream.
    pub packets_ignored: u64,
    /// Video packets the decoder refused even after being drained.
    pub packets_dropped: u64,
    /// Frames decoded and converted.
    pub frames_decoded: u64,
    /// Frames written to storage.
    pub frames_sampled: u64,
    /// Decode errors that were skipped.
    pub decode_errors: u64,
    /// Why sampling ended.
    pub stop: StopReason,
}

/// Everything [`Session::run`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RunSummary {
    pub sampling: SampleSummary,
    /// Presentation loop iterations.
    pub frames_presented: u64,
    /// Frames still buffered in the decoder at shutdown. They are discarded.
    pub trailing_frames: u64,
}

/// Receive errors in a row after which a drain stops asking for frames.
const MAX_CONSECUTIVE_RECEIVE_ERRORS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    BudgetReached,
}

/// A session over a real file, window and PPM output directory.
pub type MediaSession = Session<Demuxer, VideoDecoder, WindowPresenter, PpmDirectory>;

/// Owns the pipeline's resources and drives it.
pub struct Session<S, D, P, F>
where
    S: PacketSource,
    D: FrameDecoder,
    P: Presenter,
    F: FrameStore,
{
    // Fields drop in declaration order: the reverse of acquisition.
    store: F,
    presenter: P,
    buffer: PixelBuffer,
    converter: FrameConverter,
    decoder: D,
    source: S,
    video_stream_index: usize,
    options: PipelineOptions,
    shut_down: bool,
}

impl MediaSession {
    /// Open `path` and acquire everything the pipeline needs.
    ///
    /// Resources are acquired in this order: container, decoder, pixel
    /// buffer, window, output directory. If any step fails the ones before
    /// it are released and nothing has been written.
    ///
    /// # Errors
    ///
    /// Open-category errors for the container and decoder,
    /// [`VidpeekError::DisplayOpen`] for the window, and an I/O error if
    /// the output directory cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, options: PipelineOptions) -> Result<Self, VidpeekError> {
        let demuxer = Demuxer::open(path)?;
        let decoder = demuxer.decoder()?;

        let stream = demuxer.video_stream();
        let video_stream_index = stream.index;
        let (width, height) = options.output_size.resolve(stream.width, stream.height);
        let buffer = PixelBuffer::new(width, height)?;

        let title = options
            .window_title
            .clone()
            .unwrap_or_else(|| default_title(demuxer.path()));
        let presenter = WindowPresenter::open(width, height, &title)?;
        let store = PpmDirectory::create(&options.output_directory, &options.file_prefix)?;

        Ok(Session::from_parts(
            demuxer,
            video_stream_index,
            decoder,
            buffer,
            presenter,
            store,
            options,
        ))
    }
}

impl<S, D, P, F> Session<S, D, P, F>
where
    S: PacketSource,
    D: FrameDecoder,
    P: Presenter,
    F: FrameStore,
{
    /// Assemble a session from already acquired parts.
    pub fn from_parts(
        source: S,
        video_stream_index: usize,
        decoder: D,
        buffer: PixelBuffer,
        presenter: P,
        store: F,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            presenter,
            buffer,
            converter: FrameConverter::new(),
            decoder,
            source,
            video_stream_index,
            options,
            shut_down: false,
        }
    }

    /// Sample, present until closed, then shut down.
    pub fn run(mut self) -> Result<RunSummary, VidpeekError> {
        let sampling = self.sample()?;
        let frames_presented = self.present()?;
        let trailing_frames = self.shutdown();
        Ok(RunSummary {
            sampling,
            frames_presented,
            trailing_frames,
        })
    }

    /// Decode until the frame budget is filled or the packets run out.
    ///
    /// When the packet source ends first, the decoder is flushed so frames it
    /// was still holding are sampled too. When the budget is filled first,
    /// whatever the decoder holds is left for [`shutdown`](Self::shutdown)
    /// to discard.
    ///
    /// # Errors
    ///
    /// Conversion and persistence errors always abort. Decode errors abort
    /// only under [`DecodeErrorPolicy::Abort`].
    pub fn sample(&mut self) -> Result<SampleSummary, VidpeekError> {
        let budget = self.options.frame_budget;
        let mut summary = SampleSummary::default();
        let mut progress = ProgressTracker::new(self.options.progress.clone(), Some(budget));

        if budget == 0 {
            summary.stop = StopReason::BudgetReached;
            return Ok(summary);
        }

        loop {
            let packet = match self.source.next_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    summary.stop = StopReason::EndOfStream;
                    break;
                }
                Err(error) => {
                    log::warn!("{error}; treating it as end of stream");
                    summary.stop = StopReason::ReadError;
                    break;
                }
            };
            summary.packets_read += 1;

            if packet.stream() != self.video_stream_index {
                summary.packets_ignored += 1;
                continue;
            }

            if self.decode_packet(&packet, &mut summary, &mut progress)? == Flow::BudgetReached {
                summary.stop = StopReason::BudgetReached;
                break;
            }
        }

        if summary.stop != StopReason::BudgetReached {
            let policy = self.options.decode_error_policy;
            match self.decoder.flush() {
                Ok(()) => {
                    self.drain(&mut summary, &mut progress)?;
                }
                Err(error) => tolerate(policy, error, &mut summary)?,
            }
        }

        log::info!(
            "Sampled {} of {budget} frame(s); decoded {} frame(s) from {} packet(s), stopped on {:?}",
            summary.frames_sampled,
            summary.frames_decoded,
            summary.packets_read,
            summary.stop,
        );
        Ok(summary)
    }

    /// Show the pixel buffer until the presenter reports a close request.
    ///
    /// Returns the number of frames presented.
    pub fn present(&mut self) -> Result<u64, VidpeekError> {
        present_until_closed(&mut self.presenter, &self.buffer)
    }

    /// Flush the decoder and discard anything it still holds.
    ///
    /// Returns how many frames were discarded. Only the first call does
    /// any work; [`Drop`] calls it too.
    pub fn shutdown(&mut self) -> u64 {
        if self.shut_down {
            return 0;
        }
        self.shut_down = true;

        let discarded = drain_and_discard(&mut self.decoder);
        if discarded > 0 {
            log::debug!("Discarded {discarded} buffered frame(s) at shutdown");
        }
        discarded
    }

    /// The shared pixel buffer holding the last converted frame.
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn store(&self) -> &F {
        &self.store
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn converter(&self) -> &FrameConverter {
        &self.converter
    }

    pub fn video_stream_index(&self) -> usize {
        self.video_stream_index
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn decode_packet(
        &mut self,
        packet: &Packet,
        summary: &mut SampleSummary,
        progress: &mut ProgressTracker,
    ) -> Result<Flow, VidpeekError> {
        let policy = self.options.decode_error_policy;

        match self.decoder.submit(packet) {
            Ok(SubmitOutcome::Accepted) => {}
            Ok(SubmitOutcome::Busy) => {
                if self.drain(summary, progress)? == Flow::BudgetReached {
                    return Ok(Flow::BudgetReached);
                }
                match self.decoder.submit(packet) {
                    Ok(SubmitOutcome::Accepted) => {}
                    Ok(SubmitOutcome::Busy) => {
                        log::warn!("Decoder refused a packet after draining; dropping it");
                        summary.packets_dropped += 1;
                        return Ok(Flow::Continue);
                    }
                    Err(error) => {
                        tolerate(policy, error, summary)?;
                        return Ok(Flow::Continue);
                    }
                }
            }
            Err(error) => {
                tolerate(policy, error, summary)?;
                return Ok(Flow::Continue);
            }
        }

        self.drain(summary, progress)
    }

    /// Receive frames until the decoder blocks, sampling each one.
    fn drain(
        &mut self,
        summary: &mut SampleSummary,
        progress: &mut ProgressTracker,
    ) -> Result<Flow, VidpeekError> {
        let policy = self.options.decode_error_policy;
        let budget = self.options.frame_budget;
        let mut consecutive_errors = 0;

        loop {
            match self.decoder.receive_frame() {
                Ok(ReceiveOutcome::Frame(frame)) => {
                    self.converter.convert(&frame, &mut self.buffer)?;
                }
                Ok(ReceiveOutcome::WouldBlock | ReceiveOutcome::EndOfStream) => {
                    return Ok(Flow::Continue);
                }
                Err(error) => {
                    tolerate(policy, error, summary)?;
                    // A flushed decoder can still hold frames after a bad one.
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_RECEIVE_ERRORS {
                        log::warn!(
                            "Giving up on the decoder after {consecutive_errors} consecutive errors"
                        );
                        return Ok(Flow::Continue);
                    }
                    continue;
                }
            }
            consecutive_errors = 0;
            summary.frames_decoded += 1;

            if summary.frames_sampled < budget {
                let sequence = summary.frames_sampled;
                self.store.persist(sequence, &self.buffer)?;
                summary.frames_sampled += 1;
                progress.advance(sequence, self.buffer.pts());
            }
            if summary.frames_sampled >= budget {
                return Ok(Flow::BudgetReached);
            }
        }
    }
}

impl<S, D, P, F> Drop for Session<S, D, P, F>
where
    S: PacketSource,
    D: FrameDecoder,
    P: Presenter,
    F: FrameStore,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Present `buffer` on every iteration until a close request arrives.
///
/// Events are polled first; once a close request is seen the loop ends
/// without presenting again. Returns the number of frames presented.
pub fn present_until_closed<P>(presenter: &mut P, buffer: &PixelBuffer) -> Result<u64, VidpeekError>
where
    P: Presenter + ?Sized,
{
    let mut presented = 0;
    loop {
        let close_requested = presenter
            .poll_events()
            .iter()
            .any(|event| *event == PresenterEvent::CloseRequested);
        if close_requested {
            log::debug!("Close requested after {presented} presented frame(s)");
            return Ok(presented);
        }

        presenter.update(buffer)?;
        presenter.present()?;
        presented += 1;
    }
}

/// Decide whether a decode error ends the run.
fn tolerate(
    policy: DecodeErrorPolicy,
    error: VidpeekError,
    summary: &mut SampleSummary,
) -> Result<(), VidpeekError> {
    if error.category() != ErrorCategory::Decode || policy == DecodeErrorPolicy::Abort {
        return Err(error);
    }
    log::warn!("Skipping undecodable packet: {error}");
    summary.decode_errors += 1;
    Ok(())
}

fn default_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vidpeek".to_string())
}
