//! Elapsed-time accumulation driven by explicit ticks.

use std::time::Duration;

/// Accumulator that only advances while running.
///
/// The stopwatch never reads a wall clock; owners feed it frame deltas via
/// [`Stopwatch::advance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stopwatch {
    elapsed: Duration,
    running: bool,
}

impl Stopwatch {
    /// Creates a stopped stopwatch with no elapsed time.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    /// Creates a stopped stopwatch that already accumulated `elapsed`.
    #[must_use]
    pub const fn with_elapsed(elapsed: Duration) -> Self {
        Self {
            elapsed,
            running: false,
        }
    }

    /// Starts or resumes accumulation. Starting a running stopwatch is a no-op.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Halts accumulation, keeping the elapsed time.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Clears the elapsed time and stops the stopwatch.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Adds `dt` to the elapsed time if the stopwatch is running.
    pub fn advance(&mut self, dt: Duration) {
        if self.running {
            self.elapsed = self.elapsed.saturating_add(dt);
        }
    }

    /// Total accumulated time.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Reports whether the stopwatch is currently halted.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        !self.running
    }
}
