//! CLI-specific progress handling for blobxfer
//!
//! Provides the terminal progress bar sink for the command-line interface.

use blobxfer::{Direction, ProgressEvent, ProgressSink, format_mebibytes};
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>3}% {msg}";

/// Creates a percentage-driven progress bar (length 100)
pub fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Progress sink drawing an in-place indicatif bar on stderr
pub struct ProgressBarSink {
    pub pb: ProgressBar,
    direction: Direction,
    finished: bool,
}

impl ProgressBarSink {
    pub fn new(direction: Direction, message: &str) -> Self {
        let pb = create_progress_bar();

        // Print initial message to stderr
        eprintln!("{message}");

        Self {
            pb,
            direction,
            finished: false,
        }
    }

    fn describe(&self, event: &ProgressEvent) -> String {
        format!(
            "{} {} of {}",
            self.direction.past_tense(),
            format_mebibytes(event.transferred_bytes),
            format_mebibytes(event.total_bytes)
        )
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_progress(&mut self, event: &ProgressEvent) {
        if self.finished {
            return;
        }
        self.pb.set_position(event.percentage as u64);
        self.pb.set_message(self.describe(event));
    }

    /// Stops redrawing and leaves the bar where the last event put it
    fn close(&mut self) {
        if !self.finished {
            self.finished = true;
            self.pb.abandon();
        }
    }
}
