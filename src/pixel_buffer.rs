//! The shared RGB24 target image.

use crate::error::VidpeekError;

/// A packed RGB24 image with fixed dimensions.
///
/// Storage is contiguous and row-major with no row padding, so
/// [`data`](PixelBuffer::data) is always exactly `width * height * 3` bytes.
/// Every conversion overwrites the same storage; the buffer only ever holds
/// the most recent image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
    pts: Option<i64>,
}

impl PixelBuffer {
    /// Bytes per pixel of the packed RGB24 layout.
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Allocate a black buffer of the given size.
    ///
    /// # Errors
    ///
    /// [`VidpeekError::InvalidDimensions`] if either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, VidpeekError> {
        if width == 0 || height == 0 {
            return Err(VidpeekError::InvalidDimensions { width, height });
        }
        let length = width as usize * height as usize * Self::BYTES_PER_PIXEL;
        Ok(Self {
            width,
            height,
            data: vec![0; length],
            pts: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * Self::BYTES_PER_PIXEL
    }

    /// The raw RGB bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Timestamp of the frame last written into the buffer.
    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    /// The `[r, g, b]` value at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride() + x as usize * Self::BYTES_PER_PIXEL;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Overwrite the buffer from a plane whose rows are `source_stride` bytes
    /// apart. Padding beyond each row's `stride()` bytes is skipped.
    pub(crate) fn copy_from_plane(
        &mut self,
        plane: &[u8],
        source_stride: usize,
        pts: Option<i64>,
    ) -> Result<(), VidpeekError> {
        let row_length = self.stride();
        let rows = self.height as usize;
        let required = source_stride * (rows - 1) + row_length;
        if source_stride < row_length || plane.len() < required {
            return Err(VidpeekError::Conversion(format!(
                "plane of {} bytes with stride {source_stride} cannot fill a {}x{} RGB buffer",
                plane.len(),
                self.width,
                self.height,
            )));
        }

        if source_stride == row_length {
            self.data.copy_from_slice(&plane[..row_length * rows]);
        } else {
            for (row, target) in self.data.chunks_exact_mut(row_length).enumerate() {
                let start = row * source_stride;
                target.copy_from_slice(&plane[start..start + row_length]);
            }
        }
        self.pts = pts;
        Ok(())
    }
}
