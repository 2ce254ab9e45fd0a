//! Wall-clock timing for operations that are sometimes slow.
//!
//! Database queries and file scans in the group's pipelines usually finish
//! in milliseconds but occasionally take minutes. A [`Stopwatch`] guard logs
//! every operation's duration at debug level and escalates to a warning
//! once a threshold is crossed, so the slow ones stand out in the logs
//! without instrumenting each call site by hand.

use std::time::{Duration, Instant};

use log::{debug, warn};

/// Duration above which a finished operation is logged as slow.
pub const SLOW_THRESHOLD: Duration = Duration::from_secs(2);

/// RAII timing guard. Reports once, either on [`Stopwatch::finish`] or on
/// drop, whichever comes first.
#[derive(Debug)]
pub struct Stopwatch {
    label: String,
    threshold: Duration,
    started: Instant,
    reported: bool,
}

impl Stopwatch {
    /// Starts timing with the default [`SLOW_THRESHOLD`].
    pub fn start(label: impl Into<String>) -> Self {
        Self::with_threshold(label, SLOW_THRESHOLD)
    }

    /// Starts timing with an explicit slow threshold.
    pub fn with_threshold(label: impl Into<String>, threshold: Duration) -> Self {
        Self {
            label: label.into(),
            threshold,
            started: Instant::now(),
            reported: false,
        }
    }

    /// Time elapsed since the stopwatch started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stops timing, reports, and returns the measured duration.
    pub fn finish(mut self) -> Duration {
        let elapsed = self.elapsed();
        self.report(elapsed);
        elapsed
    }

    fn report(&mut self, elapsed: Duration) {
        if self.reported {
            return;
        }
        self.reported = true;
        if elapsed >= self.threshold {
            warn!("{} took {:.2}s", self.label, elapsed.as_secs_f64());
        } else {
            debug!("{} finished in {:.2}s", self.label, elapsed.as_secs_f64());
        }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        self.report(elapsed);
    }
}
