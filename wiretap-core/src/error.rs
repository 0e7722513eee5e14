//! Error types for Wiretap

use thiserror::Error;

/// Result type alias for Wiretap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Wiretap
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed session configuration, rejected before any resource is acquired
    #[error("Configuration error: {0}")]
    Config(String),

    /// The capture device could not be opened
    #[error("Capture open error: {0}")]
    CaptureOpen(String),

    /// The BPF filter expression failed to compile
    #[error("Filter error: {0}")]
    Filter(String),

    /// A single record failed to serialize; the stream continues without it
    #[error("Format error: {0}")]
    Format(String),

    /// Fatal write failure in a sink; aborts the owning session's pipeline
    #[error("Sink write error: {0}")]
    SinkWrite(String),

    /// An operation referenced a session id that is not registered
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    /// Network interface enumeration or lookup failure
    #[error("Interface error: {0}")]
    Interface(String),
}

impl Error {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a capture open error with a custom message
    pub fn capture_open<S: Into<String>>(msg: S) -> Self {
        Error::CaptureOpen(msg.into())
    }

    /// Create a filter error with a custom message
    pub fn filter<S: Into<String>>(msg: S) -> Self {
        Error::Filter(msg.into())
    }

    /// Create an interface error with a custom message
    pub fn interface<S: Into<String>>(msg: S) -> Self {
        Error::Interface(msg.into())
    }
}
