//! Fixed-interval polling for the viewer board.

use std::ops::ControlFlow;
use std::time::Duration;

/// Re-runs a tick on a fixed cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshLoop {
    interval: Duration,
    max_ticks: Option<u64>,
}

impl RefreshLoop {
    /// Poll forever at `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval, max_ticks: None }
    }

    /// Stop after `max_ticks` ticks.
    #[must_use]
    pub const fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// The sleep between ticks.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Run with real sleeps.
    pub fn run<F>(&self, tick: F) -> u64
    where
        F: FnMut(u64) -> ControlFlow<()>,
    {
        self.run_with_sleep(tick, std::thread::sleep)
    }

    /// Run `tick` (numbered from 0), calling `sleep` between ticks but not
    /// after the last. Stops on [`ControlFlow::Break`] or after `max_ticks`.
    /// Returns the number of ticks run.
    pub fn run_with_sleep<F, Z>(&self, mut tick: F, mut sleep: Z) -> u64
    where
        F: FnMut(u64) -> ControlFlow<()>,
        Z: FnMut(Duration),
    {
        let mut count = 0;
        loop {
            if self.max_ticks.is_some_and(|max| count >= max) {
                return count;
            }
            let flow = tick(count);
            count += 1;
            if flow.is_break() || self.max_ticks.is_some_and(|max| count >= max) {
                tracing::debug!(ticks = count, "refresh loop stopped");
                return count;
            }
            sleep(self.interval);
        }
    }
}
