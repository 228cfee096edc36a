//! Progress line on stderr.

use std::io::Write;
use std::time::{Duration, Instant};

use wavpipe_core::{ipc::events::percent_of, ProgressReporter};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Redraws `\rProgress: xx.xx%` at most every 100 ms, and always at 100%.
pub struct StderrProgress<W: Write + Send = std::io::Stderr> {
    out: W,
    last_draw: Option<Instant>,
    last_bytes: u64,
    drew_complete: bool,
}

impl StderrProgress {
    pub fn new() -> Self {
        Self::with_writer(std::io::stderr())
    }
}

impl Default for StderrProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> StderrProgress<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            last_draw: None,
            last_bytes: 0,
            drew_complete: false,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ProgressReporter for StderrProgress<W> {
    fn report(&mut self, current_bytes: u64, total_bytes: u64) {
        if current_bytes < self.last_bytes || self.drew_complete {
            return;
        }
        self.last_bytes = current_bytes;

        let percent = percent_of(current_bytes, total_bytes);
        let complete = percent >= 100.0;
        let due = self
            .last_draw
            .map_or(true, |at| at.elapsed() >= REDRAW_INTERVAL);
        if !due && !complete {
            return;
        }

        // Fire-and-forget: a closed stderr must not stop the transfer.
        let _ = write!(self.out, "\rProgress: {percent:.2}%");
        let _ = self.out.flush();
        self.last_draw = Some(Instant::now());
        self.drew_complete = complete;
    }
}
