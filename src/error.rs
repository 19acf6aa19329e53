//! The error type shared by the session engine.

use std::{borrow::Cow, error::Error, fmt, io};

/// Everything that can go wrong while running a tracking session.
#[derive(Debug)]
pub enum TrackerError {
    /// The goal queue has no more goals. This is how a session normally
    /// ends, so callers usually treat it as a state change, not a failure.
    Exhausted,

    /// No serial device could be found or opened. Telemetry is disabled
    /// when this happens, it is never fatal.
    NoDevice,

    /// Returned when io fails while writing a trial log or reading a config.
    IoError(io::Error),

    /// Returned when the CSV writer fails while flushing a trial log.
    CsvError(csv::Error),

    /// Returned when a config file cannot be deserialized.
    RonError(ron::error::SpannedError),

    /// Returned when a config file deserializes but makes no sense.
    InvalidConfig(String),

    /// The telemetry worker panicked before it could be joined.
    JoinError,
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TrackerError as TE;
        let msg = match self {
            TE::Exhausted => Cow::from("no goals left in this session"),
            TE::NoDevice => Cow::from("no serial device available"),
            TE::IoError(error) => Cow::from(format!("io error: {}", error)),
            TE::CsvError(error) => Cow::from(format!("csv error: {}", error)),
            TE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            TE::InvalidConfig(reason) => Cow::from(format!("invalid config: {}", reason)),
            TE::JoinError => Cow::from("telemetry worker panicked"),
        };

        write!(f, "{}", msg)
    }
}

impl Error for TrackerError {}

impl From<io::Error> for TrackerError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<csv::Error> for TrackerError {
    fn from(value: csv::Error) -> Self {
        // Failing to write a log is an io problem, whichever layer noticed it
        if !value.is_io_error() {
            return Self::CsvError(value);
        }
        match value.into_kind() {
            csv::ErrorKind::Io(error) => Self::IoError(error),
            other => Self::IoError(io::Error::new(io::ErrorKind::Other, format!("{:?}", other))),
        }
    }
}

impl From<ron::error::SpannedError> for TrackerError {
    fn from(value: ron::error::SpannedError) -> Self {
        Self::RonError(value)
    }
}
