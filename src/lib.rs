//! TactileTracker runs a psychophysical feedback experiment. An operator
//! tracks a moving goal position with their own position, while a
//! vibrotactile device, driven over a serial link, renders that position as
//! two motor intensities. A test is a scripted sequence of randomized goal
//! positions on a timer, and the tracking error of every frame is logged to a
//! CSV file for later analysis.
//!
//! The heart of the crate is the [`session::SessionController`]. Every frame
//! the front end hands it the user position and a millisecond clock, and gets
//! back the goal to draw:
//!
//! - [`goal_scheduler`] shuffles the goal positions for a test,
//! - [`tween`] animates the drawn goal when it moves,
//! - [`trial_logger`] keeps the per-frame log and writes it out,
//! - [`telemetry`] encodes device frames and streams them from a background
//!   thread while a test runs.
//!
//! The `visualizer` binary is a terminal front end for all of this, and the
//! `monitor` binary decodes what a device would receive, for checking the
//! wire protocol from the other end of a serial cable.

#![warn(missing_docs)]
pub mod args;
pub mod config;
pub mod device_message_decoder;
pub mod dummy_link;
pub mod error;
pub mod goal_scheduler;
pub mod gui;
pub mod interpolate;
pub mod session;
pub mod shared_value;
pub mod telemetry;
pub mod trial_logger;
pub mod tween;
