//! On-screen presentation.
//!
//! A [`Presenter`] owns a [`DisplaySurface`] sized at creation time. Callers
//! copy a [`PixelBuffer`] into it with [`Presenter::update`], publish it with
//! [`Presenter::present`], and watch for [`PresenterEvent::CloseRequested`]
//! through [`Presenter::poll_events`].
//!
//! [`WindowPresenter`] is the desktop implementation, backed by `minifb`.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use minifb::{Key, Window, WindowOptions};

use crate::{error::VidpeekError, pixel_buffer::PixelBuffer};

/// Refresh cap for the presentation loop.
const TARGET_FPS: usize = 60;

/// Input events reported by a presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PresenterEvent {
    /// The user asked to close the window.
    CloseRequested,
}

/// The in-memory backing store of a display.
///
/// Pixels are `0x00RRGGBB`, row-major, one `u32` per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySurface {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl DisplaySurface {
    /// Allocate a black surface.
    ///
    /// # Errors
    ///
    /// [`VidpeekError::InvalidDimensions`] if either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, VidpeekError> {
        if width == 0 || height == 0 {
            return Err(VidpeekError::InvalidDimensions { width, height });
        }
        let (width, height) = (width as usize, height as usize);
        Ok(Self {
            width,
            height,
            pixels: vec![0; width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Copy `buffer` into the surface.
    ///
    /// # Errors
    ///
    /// [`VidpeekError::SurfaceMismatch`] if the sizes differ. The surface is
    /// never resized to fit.
    pub fn update_from(&mut self, buffer: &PixelBuffer) -> Result<(), VidpeekError> {
        if buffer.width() as usize != self.width || buffer.height() as usize != self.height {
            return Err(VidpeekError::SurfaceMismatch {
                surface_width: self.width,
                surface_height: self.height,
                buffer_width: buffer.width(),
                buffer_height: buffer.height(),
            });
        }

        for (pixel, rgb) in self
            .pixels
            .iter_mut()
            .zip(buffer.data().chunks_exact(PixelBuffer::BYTES_PER_PIXEL))
        {
            *pixel = (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2]);
        }
        Ok(())
    }
}

/// A display that can show a [`PixelBuffer`].
pub trait Presenter {
    /// The surface frames are staged in.
    fn surface(&self) -> &DisplaySurface;

    /// Mutable access to the staging surface.
    fn surface_mut(&mut self) -> &mut DisplaySurface;

    /// Copy `buffer` into the surface without showing it yet.
    fn update(&mut self, buffer: &PixelBuffer) -> Result<(), VidpeekError> {
        self.surface_mut().update_from(buffer)
    }

    /// Show the current surface contents.
    fn present(&mut self) -> Result<(), VidpeekError>;

    /// Drain pending input events without blocking.
    fn poll_events(&mut self) -> Vec<PresenterEvent>;
}

/// A desktop window.
pub struct WindowPresenter {
    window: Window,
    surface: DisplaySurface,
    title: String,
}

impl Debug for WindowPresenter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("WindowPresenter")
            .field("title", &self.title)
            .field("width", &self.surface.width)
            .field("height", &self.surface.height)
            .finish_non_exhaustive()
    }
}

impl WindowPresenter {
    /// Open a titled window of the given size.
    ///
    /// # Errors
    ///
    /// [`VidpeekError::DisplayOpen`] if no window can be created (for
    /// example when there is no display server), or
    /// [`VidpeekError::InvalidDimensions`] for a zero size.
    pub fn open(width: u32, height: u32, title: &str) -> Result<Self, VidpeekError> {
        let surface = DisplaySurface::new(width, height)?;
        let mut window = Window::new(
            title,
            surface.width,
            surface.height,
            WindowOptions::default(),
        )
        .map_err(|error| VidpeekError::DisplayOpen(error.to_string()))?;
        window.set_target_fps(TARGET_FPS);

        log::debug!("Opened {width}x{height} window \"{title}\"");
        Ok(Self {
            window,
            surface,
            title: title.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Presenter for WindowPresenter {
    fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut DisplaySurface {
        &mut self.surface
    }

    /// Push the surface to the window. This also pumps the window's input
    /// queue and is the only call that waits on the frame rate limit.
    fn present(&mut self) -> Result<(), VidpeekError> {
        self.window
            .update_with_buffer(&self.surface.pixels, self.surface.width, self.surface.height)
            .map_err(|error| VidpeekError::DisplayUpdate(error.to_string()))
    }

    /// Report input seen by the last [`present`](Presenter::present).
    fn poll_events(&mut self) -> Vec<PresenterEvent> {
        close_events(self.window.is_open(), self.window.is_key_down(Key::Escape))
    }
}

fn close_events(window_open: bool, escape_down: bool) -> Vec<PresenterEvent> {
    if !window_open || escape_down {
        vec![PresenterEvent::CloseRequested]
    } else {
        Vec::new()
    }
}
