//! Persistent storage for sampled frames.
//!
//! [`PpmDirectory`] writes each sampled [`PixelBuffer`] as a binary PPM
//! (`P6`) file named `<prefix>-<sequence>.ppm`. The format is
//! self-describing: a header with width, height and the maximum channel
//! value, followed by the packed RGB pixels row by row.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use image::{
    ExtendedColorType, ImageEncoder,
    codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding},
};

use crate::{error::VidpeekError, pixel_buffer::PixelBuffer};

/// Somewhere sampled frames can be written.
pub trait FrameStore {
    /// Persist `buffer` as frame number `sequence`.
    ///
    /// # Errors
    ///
    /// Any failure is reported as a persist-category [`VidpeekError`]; the
    /// pipeline treats it as fatal.
    fn persist(&mut self, sequence: u64, buffer: &PixelBuffer) -> Result<(), VidpeekError>;
}

/// Writes frames as PPM files into one directory.
#[derive(Debug, Clone)]
pub struct PpmDirectory {
    directory: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl PpmDirectory {
    /// Use `directory` for output, creating it if needed.
    pub fn create<P: AsRef<Path>>(directory: P, prefix: &str) -> Result<Self, VidpeekError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            prefix: prefix.to_string(),
            written: Vec::new(),
        })
    }

    /// Where frame `sequence` is written.
    pub fn path_for(&self, sequence: u64) -> PathBuf {
        self.directory.join(format!("{}-{sequence}.ppm", self.prefix))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FrameStore for PpmDirectory {
    fn persist(&mut self, sequence: u64, buffer: &PixelBuffer) -> Result<(), VidpeekError> {
        let path = self.path_for(sequence);
        let file = File::create(&path)
            .map_err(|error| VidpeekError::persist(sequence, path.clone(), error))?;
        let mut writer = BufWriter::new(file);

        PnmEncoder::new(&mut writer)
            .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
            .write_image(
                buffer.data(),
                buffer.width(),
                buffer.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|error| VidpeekError::persist(sequence, path.clone(), error))?;
        writer
            .flush()
            .map_err(|error| VidpeekError::persist(sequence, path.clone(), error))?;

        log::debug!("Wrote frame {sequence} to {}", path.display());
        self.written.push(path);
        Ok(())
    }
}
