//! Experiment parameters. Every constant that used to differ between
//! variants of the experiment lives here, with the values of the standard
//! setup as defaults.
//!
//! Configs can be read from [ron] files. Missing fields keep their defaults,
//! so a file only needs to name what it changes:
//!
//! ```text
//! (trials_per_test: 5, goal_interval_ms: 2000)
//! ```

use crate::error::TrackerError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// The tunable parameters of a tracking experiment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// How long a goal change takes to animate, in milliseconds.
    pub tween_duration_ms: u64,
    /// Power applied to tween progress; 2 gives an ease-in curve.
    pub easing_exponent: f64,
    /// Lowest scheduled goal position.
    pub goal_min: f64,
    /// Highest scheduled goal position.
    pub goal_max: f64,
    /// Time between scheduled goal changes, in milliseconds.
    pub goal_interval_ms: u64,
    /// Number of distinct goal positions per test.
    pub trials_per_test: usize,
    /// Time between telemetry frames, in milliseconds.
    pub telemetry_interval_ms: u64,
    /// Serial link speed.
    pub baud_rate: u32,
    /// Trial logs are written to `<log_prefix>_<index>.csv`.
    pub log_prefix: String,
    /// Target frame rate of the front end.
    pub frame_rate: u32,
    /// How far one key press moves the user position.
    pub nudge_step: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            tween_duration_ms: 200,
            easing_exponent: 2.0,
            goal_min: 0.2,
            goal_max: 0.8,
            goal_interval_ms: 1000,
            trials_per_test: 10,
            telemetry_interval_ms: 500,
            baud_rate: 115200,
            log_prefix: "DEFAULT".to_owned(),
            frame_rate: 60,
            nudge_step: 0.01,
        }
    }
}

impl ExperimentConfig {
    /// Read a config from the [ron] file at `path` and validate it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let text = fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Parse a config from [ron] text and validate it.
    pub fn from_ron(text: &str) -> Result<Self, TrackerError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the goal bounds fit the unit range and that the front end
    /// has something to pace itself with. A trial count of zero is allowed;
    /// starting a test with it just does nothing.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.goal_min) || !unit.contains(&self.goal_max) {
            return Err(TrackerError::InvalidConfig(format!(
                "goal bounds [{}, {}] must lie within [0, 1]",
                self.goal_min, self.goal_max
            )));
        }
        if self.goal_min > self.goal_max {
            return Err(TrackerError::InvalidConfig(format!(
                "goal_min {} is above goal_max {}",
                self.goal_min, self.goal_max
            )));
        }
        if self.frame_rate == 0 {
            return Err(TrackerError::InvalidConfig(
                "frame_rate must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
