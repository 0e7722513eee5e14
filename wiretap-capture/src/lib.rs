//! Packet capture library for Wiretap
//!
//! This crate wraps pcap and pnet_datalink into the two capture-side
//! services the rest of Wiretap builds on:
//!
//! - **Capture source**: open a live capture with a BPF filter and stream
//!   raw frames through a bounded channel until cancelled
//! - **Interface enumeration**: list host devices with their addresses
//!   and address classifications
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use wiretap_capture::{CaptureConfig, CaptureSource};
//!
//! # async fn run() -> wiretap_core::Result<()> {
//! let config = CaptureConfig::new("eth0").with_filter("tcp");
//! let source = CaptureSource::open(&config)?;
//!
//! let stop = Arc::new(AtomicBool::new(false));
//! let mut frames = source.stream(stop.clone());
//! while let Some(frame) = frames.recv().await {
//!     println!("captured {} bytes", frame.data.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod interface;
pub mod source;

// Re-export main types
pub use interface::{get_device, list_devices, Addr, Device, IpType};
pub use source::{
    CaptureConfig, CaptureSource, DEFAULT_SNAPLEN, DEFAULT_TIMEOUT_MS, FRAME_QUEUE_DEPTH,
};
