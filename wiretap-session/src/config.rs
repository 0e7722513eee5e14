//! Session configuration

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use wiretap_capture::CaptureConfig;
use wiretap_core::{Error, Result};
use wiretap_stream::Formatter;

/// Where a session's formatted frames go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A file, created or truncated at session start
    File(PathBuf),
    /// Live fan-out to attached subscribers
    Broadcast,
}

impl FromStr for OutputTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "broadcast" {
            return Ok(OutputTarget::Broadcast);
        }
        if let Some(path) = s.strip_prefix("file:") {
            if path.is_empty() {
                return Err(Error::config("empty path in file output target"));
            }
            return Ok(OutputTarget::File(PathBuf::from(path)));
        }
        Err(Error::config(format!(
            "unknown output target '{s}' (expected \"broadcast\" or \"file:PATH\")"
        )))
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::File(path) => write!(f, "file:{}", path.display()),
            OutputTarget::Broadcast => write!(f, "broadcast"),
        }
    }
}

/// Complete configuration of one capture session
///
/// Immutable once the session has started. The format and output are
/// closed variants, so a session can never be started without both.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Device name to capture on
    pub device: String,
    /// BPF filter expression; empty means no filter
    pub filter: String,
    /// Maximum bytes captured per frame
    pub snaplen: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Capture read timeout in milliseconds
    pub timeout_ms: i32,
    /// Output format
    pub format: Formatter,
    /// Output destination
    pub output: OutputTarget,
}

impl SessionConfig {
    /// Create a configuration for the named device with default capture
    /// settings, text format and broadcast output
    pub fn new(device: impl Into<String>) -> Self {
        let capture = CaptureConfig::new(device);
        Self {
            device: capture.device,
            filter: capture.filter,
            snaplen: capture.snaplen,
            promiscuous: capture.promiscuous,
            timeout_ms: capture.timeout_ms,
            format: Formatter::Text,
            output: OutputTarget::Broadcast,
        }
    }

    /// Set the BPF filter expression
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the output format
    pub fn with_format(mut self, format: Formatter) -> Self {
        self.format = format;
        self
    }

    /// Set the output target
    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    /// The capture-side view of this configuration
    pub(crate) fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            device: self.device.clone(),
            filter: self.filter.clone(),
            snaplen: self.snaplen,
            promiscuous: self.promiscuous,
            timeout_ms: self.timeout_ms,
        }
    }
}
