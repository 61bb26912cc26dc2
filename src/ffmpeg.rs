//! FFmpeg library setup.
//!
//! FFmpeg prints its own diagnostics to stderr, independently of the Rust
//! [`log`](https://crates.io/crates/log) facade the rest of this crate uses.
//! [`set_ffmpeg_log_level`] tunes that output without requiring callers to
//! depend on `ffmpeg-next` themselves.
//!
//! ```no_run
//! use vidpeek::FfmpegLogLevel;
//!
//! vidpeek::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use std::path::Path;

use ffmpeg_next::util::log::Level;

use crate::error::VidpeekError;

/// FFmpeg console verbosity, quietest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FfmpegLogLevel {
    /// No output at all.
    Quiet,
    /// Only errors that abort the process.
    Fatal,
    /// Recoverable errors, such as a corrupt packet.
    Error,
    /// Warnings. FFmpeg's own default.
    Warning,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

/// Set FFmpeg's console log level.
///
/// Does not affect messages emitted through the `log` crate.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.into());
}

/// Initialise FFmpeg before opening `path`. Safe to call repeatedly.
pub(crate) fn initialize(path: &Path) -> Result<(), VidpeekError> {
    ffmpeg_next::init().map_err(|error| VidpeekError::FileOpen {
        path: path.to_path_buf(),
        reason: format!("FFmpeg initialisation failed: {error}"),
    })
}
