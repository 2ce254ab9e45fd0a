//! Progress logging for long-running iteration.
//!
//! Wrapping an iterator in [`Progress`] logs a short status line through the
//! `log` facade while items are consumed: total count, elapsed time, and the
//! instantaneous and average consumption rates. Batch jobs over millions of
//! rows stay observable without the pipeline knowing it is being watched.

use std::time::{Duration, Instant};

use log::{Level, log};

/// Default interval between status lines.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Iterator wrapper that periodically logs consumption progress.
#[derive(Debug)]
pub struct Progress<I> {
    inner: I,
    verb: &'static str,
    objects: &'static str,
    level: Level,
    delay: Duration,
    started: Instant,
    last_report: Instant,
    last_count: u64,
    count: u64,
    finished: bool,
}

impl<I> Progress<I> {
    /// Wraps `inner`, reporting every [`DEFAULT_DELAY`] at info level.
    pub fn new(inner: I) -> Self {
        let now = Instant::now();
        Self {
            inner,
            verb: "Processed",
            objects: "entries",
            level: Level::Info,
            delay: DEFAULT_DELAY,
            started: now,
            last_report: now,
            last_count: 0,
            count: 0,
            finished: false,
        }
    }

    /// Sets the verb used in status lines, e.g. `"Got"`.
    pub fn verb(mut self, verb: &'static str) -> Self {
        self.verb = verb;
        self
    }

    /// Sets the noun used in status lines, e.g. `"rows"`.
    pub fn objects(mut self, objects: &'static str) -> Self {
        self.objects = objects;
        self
    }

    /// Sets the log level of status lines.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the interval between status lines.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Items consumed so far.
    pub fn consumed(&self) -> u64 {
        self.count
    }

    fn report(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.started).as_secs_f64();
        let since_last = now.duration_since(self.last_report).as_secs_f64();
        let rate = if since_last > 0.0 {
            (self.count - self.last_count) as f64 / since_last
        } else {
            0.0
        };
        let avg_rate = if elapsed > 0.0 {
            self.count as f64 / elapsed
        } else {
            0.0
        };
        log!(
            self.level,
            "{} {} {} after {:.2}s ({:.2}/{:.2} {} per second)",
            self.verb,
            self.count,
            self.objects,
            elapsed,
            rate,
            avg_rate,
            self.objects
        );
        self.last_report = now;
        self.last_count = self.count;
    }
}

impl<I: Iterator> Iterator for Progress<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some(item) => {
                self.count += 1;
                if self.last_report.elapsed() >= self.delay {
                    self.report();
                }
                Some(item)
            }
            None => {
                // One summary line at the end, however short the run was.
                if !self.finished {
                    self.finished = true;
                    self.report();
                }
                None
            }
        }
    }
}
