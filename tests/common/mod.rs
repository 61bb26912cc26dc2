//! In-memory stand-ins for the pipeline's external collaborators.
//!
//! Packets and frames are real FFmpeg objects allocated in memory, so the
//! real [`FrameConverter`](vidpeek::FrameConverter) runs against them.

#![allow(dead_code)]

use std::{collections::VecDeque, path::Path};

use ffmpeg_next::{
    Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    format::{Flags as FormatFlags, Pixel},
    frame::Video as VideoFrame,
};
use vidpeek::{
    DecodedFrame, DisplaySurface, FrameDecoder, FrameStore, PacketSource, PixelBuffer,
    Presenter, PresenterEvent, ReceiveOutcome, SubmitOutcome, VidpeekError,
};

pub const VIDEO_STREAM: usize = 0;
pub const AUDIO_STREAM: usize = 1;

/// First payload byte of a packet the fake decoder rejects.
const CORRUPT_MARKER: u8 = 0xEE;

/// A video packet that decodes into `frames` frames.
pub fn video_packet(pts: i64, frames: usize) -> Packet {
    let payload = vec![1u8; frames.max(1)];
    let mut packet = Packet::copy(&payload);
    packet.set_stream(VIDEO_STREAM);
    packet.set_pts(Some(pts));
    packet
}

pub fn audio_packet(pts: i64) -> Packet {
    let mut packet = Packet::copy(&[0u8; 4]);
    packet.set_stream(AUDIO_STREAM);
    packet.set_pts(Some(pts));
    packet
}

pub fn corrupt_packet(pts: i64) -> Packet {
    let mut packet = Packet::copy(&[CORRUPT_MARKER]);
    packet.set_stream(VIDEO_STREAM);
    packet.set_pts(Some(pts));
    packet
}

/// `count` single-frame video packets with pts `0..count`.
pub fn video_packets(count: i64) -> Vec<Packet> {
    (0..count).map(|pts| video_packet(pts, 1)).collect()
}

/// A frame with every byte of every plane set to `value`.
pub fn solid_frame(format: Pixel, width: u32, height: u32, value: u8) -> VideoFrame {
    let mut frame = VideoFrame::new(format, width, height);
    for plane in 0..frame.planes() {
        frame.data_mut(plane).fill(value);
    }
    frame
}

/// A YUV420P frame that converts to a flat grey of roughly `luma`.
pub fn grey_yuv_frame(width: u32, height: u32, luma: u8) -> VideoFrame {
    let mut frame = VideoFrame::new(Pixel::YUV420P, width, height);
    frame.data_mut(0).fill(luma);
    frame.data_mut(1).fill(128);
    frame.data_mut(2).fill(128);
    frame
}

pub struct FakeSource {
    packets: VecDeque<Result<Packet, VidpeekError>>,
    pub reads: usize,
}

impl FakeSource {
    pub fn new(packets: Vec<Packet>) -> Self {
        Self {
            packets: packets.into_iter().map(Ok).collect(),
            reads: 0,
        }
    }

    /// Make the read after the current packets fail.
    pub fn then_fail(mut self) -> Self {
        self.packets
            .push_back(Err(VidpeekError::PacketRead("simulated I/O failure".to_string())));
        self
    }

    pub fn then(mut self, packets: Vec<Packet>) -> Self {
        self.packets.extend(packets.into_iter().map(Ok));
        self
    }

    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

impl PacketSource for FakeSource {
    fn next_packet(&mut self) -> Result<Option<Packet>, VidpeekError> {
        self.reads += 1;
        self.packets.pop_front().transpose()
    }
}

/// A decoder that holds back `delay` frames until it is flushed, like a
/// codec reordering B-frames.
pub struct FakeDecoder {
    sizes: Vec<(u32, u32)>,
    delay: usize,
    pending: VecDeque<VideoFrame>,
    current: VideoFrame,
    flushed: bool,
    produced: usize,
    receive_errors_after_flush: usize,
    pub submitted: usize,
    pub flushes: usize,
}

impl FakeDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            sizes: vec![(width, height)],
            delay: 0,
            pending: VecDeque::new(),
            current: VideoFrame::empty(),
            flushed: false,
            produced: 0,
            receive_errors_after_flush: 0,
            submitted: 0,
            flushes: 0,
        }
    }

    pub fn with_delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    /// Cycle through these frame sizes, one per produced frame.
    pub fn with_sizes(mut self, sizes: Vec<(u32, u32)>) -> Self {
        self.sizes = sizes;
        self
    }

    /// Fail the first `count` receives after a flush, keeping the frames.
    pub fn with_receive_errors_after_flush(mut self, count: usize) -> Self {
        self.receive_errors_after_flush = count;
        self
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn ready(&self) -> usize {
        if self.flushed {
            self.pending.len()
        } else {
            self.pending.len().saturating_sub(self.delay)
        }
    }
}

impl FrameDecoder for FakeDecoder {
    fn submit(&mut self, packet: &Packet) -> Result<SubmitOutcome, VidpeekError> {
        if self.flushed {
            return Err(VidpeekError::DecoderFlushed);
        }
        if self.ready() > 0 {
            return Ok(SubmitOutcome::Busy);
        }

        let payload = packet.data().unwrap_or(&[]);
        if payload.first() == Some(&CORRUPT_MARKER) {
            return Err(VidpeekError::VideoDecodeError("corrupt packet".to_string()));
        }

        self.submitted += 1;
        let pts = packet.pts().unwrap_or(0);
        for _ in 0..payload.len() {
            let (width, height) = self.sizes[self.produced % self.sizes.len()];
            let mut frame = grey_yuv_frame(width, height, 16 + (self.produced % 200) as u8);
            frame.set_pts(Some(pts));
            self.pending.push_back(frame);
            self.produced += 1;
        }
        Ok(SubmitOutcome::Accepted)
    }

    fn receive_frame(&mut self) -> Result<ReceiveOutcome<'_>, VidpeekError> {
        if self.flushed && self.receive_errors_after_flush > 0 {
            self.receive_errors_after_flush -= 1;
            return Err(VidpeekError::VideoDecodeError(
                "damaged reference frame".to_string(),
            ));
        }
        if self.ready() == 0 {
            return Ok(if self.flushed {
                ReceiveOutcome::EndOfStream
            } else {
                ReceiveOutcome::WouldBlock
            });
        }
        match self.pending.pop_front() {
            Some(frame) => {
                self.current = frame;
                Ok(ReceiveOutcome::Frame(DecodedFrame::new(&self.current)))
            }
            None => Ok(ReceiveOutcome::WouldBlock),
        }
    }

    fn flush(&mut self) -> Result<(), VidpeekError> {
        self.flushed = true;
        self.flushes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFrame {
    pub sequence: u64,
    pub pts: Option<i64>,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    pub saved: Vec<SavedFrame>,
    pub fail_at: Option<u64>,
}

impl MemoryStore {
    pub fn failing_at(sequence: u64) -> Self {
        Self {
            saved: Vec::new(),
            fail_at: Some(sequence),
        }
    }
}

impl FrameStore for MemoryStore {
    fn persist(&mut self, sequence: u64, buffer: &PixelBuffer) -> Result<(), VidpeekError> {
        if self.fail_at == Some(sequence) {
            return Err(VidpeekError::FramePersist {
                sequence,
                path: format!("memory/{sequence}").into(),
                reason: "disk full".to_string(),
            });
        }
        self.saved.push(SavedFrame {
            sequence,
            pts: buffer.pts(),
            width: buffer.width(),
            height: buffer.height(),
            bytes: buffer.data().len(),
        });
        Ok(())
    }
}

/// A presenter that asks to close after a fixed number of polls.
pub struct FakePresenter {
    surface: DisplaySurface,
    close_after_polls: usize,
    pub polls: usize,
    pub presented: Vec<Vec<u32>>,
}

impl FakePresenter {
    pub fn new(width: u32, height: u32, close_after_polls: usize) -> Self {
        Self {
            surface: DisplaySurface::new(width, height).expect("surface"),
            close_after_polls,
            polls: 0,
            presented: Vec::new(),
        }
    }
}

impl Presenter for FakePresenter {
    fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut DisplaySurface {
        &mut self.surface
    }

    fn present(&mut self) -> Result<(), VidpeekError> {
        self.presented.push(self.surface.pixels().to_vec());
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PresenterEvent> {
        self.polls += 1;
        if self.polls >= self.close_after_polls {
            vec![PresenterEvent::CloseRequested]
        } else {
            Vec::new()
        }
    }
}

/// An RGB24 frame where every pixel is `rgb`.
pub fn rgb_frame(width: u32, height: u32, rgb: [u8; 3]) -> VideoFrame {
    let mut frame = VideoFrame::new(Pixel::RGB24, width, height);
    let stride = frame.stride(0);
    let row_length = width as usize * 3;
    let data = frame.data_mut(0);
    for row in 0..height as usize {
        let start = row * stride;
        for pixel in data[start..start + row_length].chunks_exact_mut(3) {
            pixel.copy_from_slice(&rgb);
        }
    }
    frame
}

/// Encode `frame_count` MPEG-4 frames of `width`x`height` into `path`.
///
/// B-frames are enabled so the decoder holds frames back until it is
/// flushed. Returns a message instead of panicking when the local FFmpeg
/// build lacks the encoder or muxer, so callers can skip.
pub fn write_test_video(
    path: &Path,
    frame_count: usize,
    width: u32,
    height: u32,
) -> Result<(), String> {
    const FPS: i32 = 10;
    let encoder_time_base = Rational::new(1, FPS);

    ffmpeg_next::init().map_err(|e| format!("init: {e}"))?;
    let mut output = ffmpeg_next::format::output(&path).map_err(|e| format!("output: {e}"))?;
    let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

    let codec = ffmpeg_next::encoder::find(Id::MPEG4).ok_or("codec MPEG4 not available")?;
    let mut stream = output.add_stream(codec).map_err(|e| format!("stream: {e}"))?;
    let stream_index = stream.index();

    let mut encoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.encoder().video())
        .map_err(|e| format!("encoder context: {e}"))?;
    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_time_base(encoder_time_base);
    encoder.set_frame_rate(Some(Rational::new(FPS, 1)));
    encoder.set_gop(6);
    encoder.set_max_b_frames(2);
    if needs_global_header {
        unsafe {
            (*encoder.as_mut_ptr()).flags |= ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
        }
    }

    let mut encoder = encoder
        .open_as(codec)
        .map_err(|e| format!("cannot open encoder: {e}"))?;
    stream.set_parameters(&encoder);
    output.write_header().map_err(|e| format!("header: {e}"))?;
    let stream_time_base = output
        .stream(stream_index)
        .map(|stream| stream.time_base())
        .ok_or("stream vanished")?;

    for index in 0..frame_count {
        let mut frame = grey_yuv_frame(width, height, 30 + (index * 15 % 200) as u8);
        frame.set_pts(Some(index as i64));
        encoder
            .send_frame(&frame)
            .map_err(|e| format!("send_frame: {e}"))?;
        write_pending(
            &mut encoder,
            &mut output,
            stream_index,
            encoder_time_base,
            stream_time_base,
        )?;
    }
    encoder.send_eof().map_err(|e| format!("send_eof: {e}"))?;
    write_pending(
        &mut encoder,
        &mut output,
        stream_index,
        encoder_time_base,
        stream_time_base,
    )?;

    output.write_trailer().map_err(|e| format!("trailer: {e}"))
}

fn write_pending(
    encoder: &mut ffmpeg_next::encoder::video::Encoder,
    output: &mut ffmpeg_next::format::context::Output,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
) -> Result<(), String> {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(stream_index);
        packet.rescale_ts(encoder_time_base, stream_time_base);
        packet
            .write_interleaved(output)
            .map_err(|e| format!("write packet: {e}"))?;
    }
    Ok(())
}

/// Write a mono 16-bit PCM WAV file with `samples` samples of silence.
pub fn write_silent_wav(path: &Path, samples: u32) -> std::io::Result<()> {
    const SAMPLE_RATE: u32 = 8_000;
    let data_length = samples * 2;

    let mut bytes = Vec::with_capacity(44 + data_length as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_length).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_length.to_le_bytes());
    bytes.resize(44 + data_length as usize, 0);
    std::fs::write(path, bytes)
}
