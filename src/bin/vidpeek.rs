use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use vidpeek::{
    DEFAULT_FRAME_BUDGET, FfmpegLogLevel, MediaSession, PipelineOptions, ProgressCallback,
    ProgressInfo,
};

const DEFAULT_INPUT: &str = "./assets/dummy.mp4";

#[derive(Debug, Parser)]
#[command(
    name = "vidpeek",
    version,
    about = "Save the first frames of a video as PPM images and show the last one",
    after_help = "Frames are written to ./frames. Close the window or press Escape to quit."
)]
struct Cli {
    /// Video file to open.
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let template = "{prefix:.cyan.bold} [{bar:30}] {pos}/{len}";
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix("sampling");
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.current);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    vidpeek::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    let progress = Arc::new(TerminalProgress::new(DEFAULT_FRAME_BUDGET));
    let options = PipelineOptions::new().with_progress(progress.clone());
    let output_directory = options.output_directory().to_path_buf();

    let session = MediaSession::open(&cli.input, options)?;
    let stream = session.decoder().stream();
    eprintln!(
        "{} {} ({} {}x{})",
        "opened".green().bold(),
        cli.input.display(),
        stream.codec,
        stream.width,
        stream.height,
    );

    let summary = session.run();
    progress.finish();
    let summary = summary?;

    eprintln!(
        "{} {} frame(s) to {}",
        "saved".green().bold(),
        summary.sampling.frames_sampled,
        output_directory.display(),
    );
    if summary.sampling.decode_errors > 0 {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!(
                "skipped {} packet(s) that failed to decode",
                summary.sampling.decode_errors
            )
            .yellow()
        );
    }
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
