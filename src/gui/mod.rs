//! Terminal front end for the tracker, built on [ratatui] and [crossterm].

mod device_selector;
mod error;
mod tracker;

pub use device_selector::device_selector;
pub use error::TrackerGuiError;
pub use tracker::run_tracker;
