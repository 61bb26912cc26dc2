//! Pixel format and size conversion.
//!
//! [`FrameConverter`] rescales a [`DecodedFrame`] of any size and pixel format
//! into a [`PixelBuffer`]'s fixed RGB24 layout. The swscale context is cached
//! and only rebuilt when the source format or either side's dimensions
//! change, which keeps the common case of a constant stream cheap while still
//! coping with mid-stream changes.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{decoder::DecodedFrame, error::VidpeekError, pixel_buffer::PixelBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScalerKey {
    format: Pixel,
    width: u32,
    height: u32,
    target_width: u32,
    target_height: u32,
}

/// Converts decoded frames into a [`PixelBuffer`].
pub struct FrameConverter {
    scaler: Option<(ScalerKey, ScalingContext)>,
    scaled_frame: VideoFrame,
    conversions: u64,
    rebuilds: u64,
}

impl Debug for FrameConverter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameConverter")
            .field("scaler", &self.scaler.as_ref().map(|(key, _)| key))
            .field("conversions", &self.conversions)
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}

impl Default for FrameConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameConverter {
    pub fn new() -> Self {
        Self {
            scaler: None,
            scaled_frame: VideoFrame::empty(),
            conversions: 0,
            rebuilds: 0,
        }
    }

    /// Convert `frame` into `target`, overwriting its previous contents.
    ///
    /// The target keeps its width and height; the frame is scaled to fit.
    ///
    /// # Errors
    ///
    /// [`VidpeekError::UnsupportedPixelFormat`] when swscale cannot read the
    /// frame's format or the frame is empty, [`VidpeekError::Conversion`]
    /// when scaling itself fails.
    pub fn convert(
        &mut self,
        frame: &DecodedFrame<'_>,
        target: &mut PixelBuffer,
    ) -> Result<(), VidpeekError> {
        let key = ScalerKey {
            format: frame.format(),
            width: frame.width(),
            height: frame.height(),
            target_width: target.width(),
            target_height: target.height(),
        };

        if self
            .scaler
            .as_ref()
            .is_none_or(|(cached, _)| *cached != key)
        {
            self.rebuild(key)?;
        }
        let Some((_, scaler)) = self.scaler.as_mut() else {
            return Err(VidpeekError::Conversion(
                "scaler was not initialised".to_string(),
            ));
        };

        scaler
            .run(frame.as_video_frame(), &mut self.scaled_frame)
            .map_err(|error| VidpeekError::Conversion(error.to_string()))?;

        target.copy_from_plane(
            self.scaled_frame.data(0),
            self.scaled_frame.stride(0),
            frame.pts(),
        )?;
        self.conversions += 1;
        Ok(())
    }

    /// Number of successful conversions.
    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    /// How many times the scaler had to be (re)built.
    pub fn scaler_rebuilds(&self) -> u64 {
        self.rebuilds
    }

    fn rebuild(&mut self, key: ScalerKey) -> Result<(), VidpeekError> {
        ensure_supported(key)?;

        log::debug!(
            "Building scaler {:?} {}x{} -> RGB24 {}x{}",
            key.format,
            key.width,
            key.height,
            key.target_width,
            key.target_height,
        );

        let context = ScalingContext::get(
            key.format,
            key.width,
            key.height,
            Pixel::RGB24,
            key.target_width,
            key.target_height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| {
            VidpeekError::UnsupportedPixelFormat(format!("{:?}: {error}", key.format))
        })?;

        self.scaler = Some((key, context));
        // The scratch frame is sized for the old output; let the scaler reallocate it.
        self.scaled_frame = VideoFrame::empty();
        self.rebuilds += 1;
        Ok(())
    }
}

fn ensure_supported(key: ScalerKey) -> Result<(), VidpeekError> {
    if key.format == Pixel::None || key.width == 0 || key.height == 0 {
        return Err(VidpeekError::UnsupportedPixelFormat(format!(
            "{:?} frame of {}x{}",
            key.format, key.width, key.height,
        )));
    }

    let supported = unsafe { ffmpeg_sys_next::sws_isSupportedInput(key.format.into()) } > 0;
    if !supported {
        return Err(VidpeekError::UnsupportedPixelFormat(format!(
            "{:?} cannot be read by swscale",
            key.format,
        )));
    }
    Ok(())
}
