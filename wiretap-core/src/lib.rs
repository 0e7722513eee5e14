//! Wiretap Core Library
//!
//! This crate provides the fundamental types, error handling and
//! per-session statistics shared by the Wiretap capture crates.

pub mod error;
pub mod record;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use record::{Layer, RawFrame, Record};
pub use session::{SessionId, SessionStats, SessionStatsCounters};
