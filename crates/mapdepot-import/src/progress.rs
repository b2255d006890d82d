//! Progress reporting for an import run
//!
//! The pipeline reports through a collaborator trait after every flush and
//! once at completion; it never assumes a particular display mechanism. The
//! console implementation rewrites a single line in place rather than
//! accumulating output.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::stream::RecordKind;

/// Monotonically non-decreasing per-kind totals for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportCounts {
    pub points: u64,
    pub paths: u64,
    pub groups: u64,
}

impl ImportCounts {
    /// Add flushed entities to the total for one kind
    pub fn add(&mut self, kind: RecordKind, flushed: usize) {
        let flushed = flushed as u64;
        match kind {
            RecordKind::Point => self.points += flushed,
            RecordKind::Path => self.paths += flushed,
            RecordKind::Group => self.groups += flushed,
        }
    }

    pub fn total(&self) -> u64 {
        self.points + self.paths + self.groups
    }

    /// The progress line shown to the operator
    pub fn display_line(&self) -> String {
        format!(
            "Points processed: {}    Paths processed: {}    Groups processed: {}",
            self.points, self.paths, self.groups
        )
    }
}

/// Collaborator invoked by the pipeline after each flush and at completion
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, counts: ImportCounts);

    fn on_complete(&self, counts: ImportCounts);
}

/// Single overwriting console progress line
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("Invalid spinner template"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn on_progress(&self, counts: ImportCounts) {
        self.bar.set_message(counts.display_line());
    }

    fn on_complete(&self, counts: ImportCounts) {
        self.bar.finish_with_message(counts.display_line());
    }
}

/// Reporter that discards all updates
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn on_progress(&self, _counts: ImportCounts) {}

    fn on_complete(&self, _counts: ImportCounts) {}
}
