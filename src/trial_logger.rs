//! Collects one row of tracking data per tick while a test runs, and writes
//! the lot out as CSV when the test ends.

use crate::error::TrackerError;
use log::info;
use std::{fs::File, path::PathBuf};

const HEADER: [&str; 4] = ["Time", "Current", "Target", "Error"];

/// In-memory trial log for the running test.
#[derive(Debug, Clone, Default)]
pub struct TrialLogger {
    rows: Vec<Vec<String>>,
}

impl TrialLogger {
    /// An empty log, not recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh log holding just the header row.
    pub fn begin(&mut self) {
        self.rows = vec![HEADER.iter().map(|h| h.to_string()).collect()];
    }

    /// Append one row. `elapsed_millis` is time since the test started,
    /// `goal_value` is the scheduled target, not the animated one.
    pub fn record(&mut self, elapsed_millis: u64, user_value: f64, goal_value: f64) {
        let error = user_value - goal_value;
        self.rows.push(vec![
            elapsed_millis.to_string(),
            user_value.to_string(),
            goal_value.to_string(),
            error.to_string(),
        ]);
    }

    /// Write everything to `<prefix>_<index>.csv` and empty the log. The
    /// rows are dropped even if writing fails. Returns the file written.
    pub fn flush(&mut self, prefix: &str, index: u64) -> Result<PathBuf, TrackerError> {
        let path = log_path(prefix, index);
        let rows = std::mem::take(&mut self.rows);

        let file = File::create(&path)?;
        let mut writer = csv::WriterBuilder::new().flexible(false).from_writer(file);
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        info!("Wrote {} rows to {}", rows.len().saturating_sub(1), path.display());
        Ok(path)
    }

    /// Rows collected so far, header first.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Whether `begin` was called since the last flush.
    pub fn is_recording(&self) -> bool {
        !self.rows.is_empty()
    }
}

/// Where the log with sequence number `index` goes.
pub fn log_path(prefix: &str, index: u64) -> PathBuf {
    PathBuf::from(format!("{}_{}.csv", prefix, index))
}
