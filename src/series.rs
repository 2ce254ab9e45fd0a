//! Streaming helpers for measurement series.
//!
//! Sensor feeds in the group's projects arrive as timestamped samples with
//! occasional gaps. [`Smoother`] applies an exponential moving average with
//! an explicit policy for missing and stale input, [`differentiate`] turns a
//! cumulative signal into a per-second rate, and the CSV helpers export the
//! result deterministically for downstream analysis.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// One timestamped measurement. A `None` value models a sensor gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Timestamp in seconds since an arbitrary epoch.
    pub stamp_s: f64,
    /// Measured value, absent during sensor gaps.
    pub value: Option<f32>,
}

impl Sample {
    pub fn new(stamp_s: f64, value: f32) -> Self {
        Self {
            stamp_s,
            value: Some(value),
        }
    }

    /// A sample with a timestamp but no measurement.
    pub fn missing(stamp_s: f64) -> Self {
        Self {
            stamp_s,
            value: None,
        }
    }
}

/// What the smoother emits while the input value is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Carry the previous smoothed value through the gap.
    #[default]
    HoldLast,
    /// Drop the smoothing state; the next valid sample reseeds it.
    Reset,
}

/// A sample annotated with its smoothed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedRow {
    pub stamp_s: f64,
    pub value: Option<f32>,
    pub smoothed: Option<f32>,
}

/// Streaming exponential smoother:
/// `s[n] = alpha * s[n-1] + (1 - alpha) * x[n]`.
///
/// The first valid input seeds the state directly. Missing input is handled
/// per [`GapPolicy`]; a configurable maximum gap additionally treats input
/// after a long silence as a fresh series (the state is reseeded rather
/// than dragging a stale average into new data).
#[derive(Debug, Clone)]
pub struct Smoother {
    alpha: f32,
    policy: GapPolicy,
    max_gap_s: Option<f64>,
    last_smoothed: Option<f32>,
    last_stamp: Option<f64>,
}

impl Smoother {
    /// Creates a smoother with the given weight on the previous state.
    /// The group's pipelines typically use `alpha = 0.95`.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            policy: GapPolicy::default(),
            max_gap_s: None,
            last_smoothed: None,
            last_stamp: None,
        }
    }

    /// Sets the policy applied while input values are missing.
    pub fn gap_policy(mut self, policy: GapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reseeds the state when consecutive samples are further apart than
    /// `max_gap_s` seconds.
    pub fn max_gap_s(mut self, max_gap_s: f64) -> Self {
        self.max_gap_s = Some(max_gap_s);
        self
    }

    /// Feeds one sample and returns its smoothed value, if any.
    pub fn push(&mut self, sample: Sample) -> Option<f32> {
        if let (Some(max_gap), Some(last)) = (self.max_gap_s, self.last_stamp) {
            if sample.stamp_s - last > max_gap {
                self.last_smoothed = None;
            }
        }
        self.last_stamp = Some(sample.stamp_s);

        match sample.value {
            Some(value) => {
                let smoothed = match self.last_smoothed {
                    // First sensible value in the series seeds the state.
                    None => value,
                    Some(prev) => self.alpha * prev + (1.0 - self.alpha) * value,
                };
                self.last_smoothed = Some(smoothed);
                Some(smoothed)
            }
            None => match self.policy {
                GapPolicy::HoldLast => self.last_smoothed,
                GapPolicy::Reset => {
                    self.last_smoothed = None;
                    None
                }
            },
        }
    }

    /// Drops all state; the next valid sample reseeds the smoother.
    pub fn reset(&mut self) {
        self.last_smoothed = None;
        self.last_stamp = None;
    }
}

/// Runs `smoother` over `samples`, pairing every sample with its smoothed
/// value.
pub fn smooth(samples: &[Sample], mut smoother: Smoother) -> Vec<SmoothedRow> {
    samples
        .iter()
        .map(|&sample| SmoothedRow {
            stamp_s: sample.stamp_s,
            value: sample.value,
            smoothed: smoother.push(sample),
        })
        .collect()
}

/// Per-second rate of change between consecutive valid samples.
///
/// The first sample, samples on either side of a gap, and samples whose
/// timestamp does not advance all yield `0.0`, keeping the output aligned
/// index-for-index with the input.
pub fn differentiate(samples: &[Sample]) -> Vec<f32> {
    let mut rates = Vec::with_capacity(samples.len());
    let mut prev: Option<&Sample> = None;
    for sample in samples {
        let rate = match (prev, sample.value) {
            (Some(p), Some(value)) => match p.value {
                Some(prev_value) if sample.stamp_s > p.stamp_s => {
                    ((value - prev_value) as f64 / (sample.stamp_s - p.stamp_s)) as f32
                }
                _ => 0.0,
            },
            _ => 0.0,
        };
        rates.push(rate);
        prev = Some(sample);
    }
    rates
}

/// Schema v1 column header for smoothed-series CSV export.
pub const SERIES_SCHEMA_V1_HEADER: &str = "stamp_s,value,smoothed";

/// Writes smoothed rows as CSV to any writer.
///
/// Missing values become empty fields. Produces deterministic output for
/// identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(rows: &[SmoothedRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(SERIES_SCHEMA_V1_HEADER.split(','))?;

    for row in rows {
        wtr.write_record(&[
            format!("{:.3}", row.stamp_s),
            row.value.map(|v| format!("{v:.6}")).unwrap_or_default(),
            row.smoothed.map(|v| format!("{v:.6}")).unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports smoothed rows to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(rows: &[SmoothedRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(rows, buf)
}
