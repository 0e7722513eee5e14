//! Streaming stages for Wiretap
//!
//! The downstream half of a capture pipeline:
//!
//! - **Formatter**: records to serialized frames (text or JSON), one task
//!   between two bounded channels
//! - **Sink**: terminal frame consumer (file or broadcast)
//! - **Broadcaster**: fan-out of one frame stream to a dynamic set of
//!   subscribers without a slow consumer stalling the rest

pub mod broadcast;
pub mod format;
pub mod sink;

// Re-export main types
pub use broadcast::{Broadcaster, Subscriber, SUBSCRIBER_QUEUE_DEPTH};
pub use format::{hex_dump, Formatter, FORMAT_QUEUE_DEPTH};
pub use sink::Sink;
