use std::{error::Error, fmt::Display, io};

use crate::error::TrackerError;

/// Errors that end the tracking display.
#[derive(Debug)]
pub enum TrackerGuiError {
    /// The terminal could not be driven.
    IOError(io::Error),
    /// The session controller failed.
    SessionError(TrackerError),
}

impl Display for TrackerGuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IOError(e) => write!(f, "terminal error: {}", e),
            Self::SessionError(e) => write!(f, "session error: {}", e),
        }
    }
}

impl Error for TrackerGuiError {}

impl From<io::Error> for TrackerGuiError {
    fn from(value: io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<TrackerError> for TrackerGuiError {
    fn from(value: TrackerError) -> Self {
        Self::SessionError(value)
    }
}
