//! Session management for Wiretap
//!
//! A session is one independent, cancellable capture-to-output pipeline
//! identified by an opaque id. The `SessionManager` creates, tracks and
//! tears down concurrent sessions:
//!
//! - Start: open capture and sink synchronously, then run
//!   capture → decode → format → sink as independent tasks
//! - Stop: cancel the capture and let every downstream stage drain as
//!   its input closes
//! - Query: read-only lookups of session descriptions and statistics

pub mod config;
pub mod manager;

// Re-export main types
pub use config::{OutputTarget, SessionConfig};
pub use manager::{SessionInfo, SessionManager};
