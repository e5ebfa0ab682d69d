//! Tumbling-window aggregation: groups followed lines into non-overlapping,
//! contiguous, fixed-duration wall-clock windows.

use crate::tail::LineSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Buffers lines until the window duration elapses, then hands the batch
/// downstream and resets. Window boundaries come from elapsed wall-clock
/// time since the last flush, never from line counts.
pub struct WindowAggregator {
    window: Duration,
    buf: Vec<String>,
    last_flush: Instant,
}

impl WindowAggregator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            buf: Vec::new(),
            last_flush: Instant::now(),
        }
    }

    /// Block until the current window closes and return its batch, which may
    /// be empty (a quiet window still closes on schedule); the caller
    /// discards empty batches without scoring them.
    ///
    /// Each iteration does one `poll` on the source (bounded by the source's
    /// idle sleep) plus a time check, so `stop` is observed promptly. On
    /// stop this returns `None` and the partial window is discarded, not
    /// flushed.
    pub fn next_batch<S: LineSource>(
        &mut self,
        source: &mut S,
        stop: &AtomicBool,
    ) -> Option<Vec<String>> {
        loop {
            if stop.load(Ordering::Relaxed) {
                self.buf.clear();
                return None;
            }
            if let Some(line) = source.poll() {
                self.buf.push(line);
            }
            if self.last_flush.elapsed() >= self.window {
                self.last_flush = Instant::now();
                return Some(std::mem::take(&mut self.buf));
            }
        }
    }
}
