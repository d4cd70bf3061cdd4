//! Time-based progress indicator for the common resource load.
//!
//! The position counts seconds and is capped at the expected duration. It is an
//! estimate for the operator and never affects the load itself.

use std::io::Write;

const BAR_WIDTH: usize = 30;

/// Monotonic position capped at `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    position: u64,
    total: u64,
}

impl ProgressState {
    pub fn new(total: u64) -> Self {
        Self { position: 0, total }
    }

    pub fn advance(&mut self, delta: u64) {
        self.position = self.position.saturating_add(delta).min(self.total);
    }

    pub fn complete(&mut self) {
        self.position = self.total;
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.total
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.position as f64 / self.total as f64
        }
    }
}

/// Receives progress updates from the foreground loop.
pub trait ProgressSink {
    fn advance(&mut self, delta: u64);

    /// Jump to the maximum displayed value.
    fn finish(&mut self);
}

/// `Progress:  37%|███████             | 89/240 [01:29]` redrawn in place on stderr.
pub struct TerminalProgress<W: Write = std::io::Stderr> {
    state: ProgressState,
    elapsed_secs: u64,
    out: W,
}

impl TerminalProgress {
    pub fn stderr(total: u64) -> Self {
        Self::with_writer(total, std::io::stderr())
    }
}

impl<W: Write> TerminalProgress<W> {
    pub fn with_writer(total: u64, out: W) -> Self {
        let mut progress = Self {
            state: ProgressState::new(total),
            elapsed_secs: 0,
            out,
        };
        progress.draw();
        progress
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self) {
        let line = render_line(&self.state, self.elapsed_secs);
        // Progress output is best effort.
        let _ = write!(self.out, "\r{line}");
        let _ = self.out.flush();
    }
}

impl<W: Write> ProgressSink for TerminalProgress<W> {
    fn advance(&mut self, delta: u64) {
        self.elapsed_secs += delta;
        self.state.advance(delta);
        self.draw();
    }

    fn finish(&mut self) {
        self.state.complete();
        self.draw();
        let _ = writeln!(self.out);
    }
}

/// Render one progress line without the carriage return.
pub fn render_line(state: &ProgressState, elapsed_secs: u64) -> String {
    let filled = ((state.ratio() * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let empty = BAR_WIDTH - filled;
    format!(
        "Progress: {:>3}%|{}{}| {}/{} [{:02}:{:02}]",
        (state.ratio() * 100.0).round() as u64,
        "█".repeat(filled),
        " ".repeat(empty),
        state.position(),
        state.total(),
        elapsed_secs / 60,
        elapsed_secs % 60,
    )
}
