//! Live packet capture source
//!
//! Wraps a pcap capture handle into a lazy, cancellable stream of raw
//! frames. The handle is moved onto a blocking task; the read timeout
//! bounds how long cancellation can take, and the canceller itself never
//! blocks. Dropping the handle when the loop exits closes the device.

use chrono::{DateTime, TimeZone, Utc};
use pcap::{Active, Capture};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use wiretap_core::{Error, RawFrame, Result};

use crate::interface;

/// Default snapshot length (maximum bytes per frame)
pub const DEFAULT_SNAPLEN: i32 = 65535;

/// Default read timeout in milliseconds; also the upper bound on how long
/// a cancelled capture keeps its device open
pub const DEFAULT_TIMEOUT_MS: i32 = 1000;

/// Frames buffered between the capture loop and the decode stage
pub const FRAME_QUEUE_DEPTH: usize = 16;

/// Configuration for opening a live capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Device name to capture on
    pub device: String,
    /// BPF filter expression; empty means no filter
    pub filter: String,
    /// Maximum bytes to capture per frame
    pub snaplen: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Read timeout in milliseconds
    pub timeout_ms: i32,
}

impl CaptureConfig {
    /// Create a configuration for the named device with default settings
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            filter: String::new(),
            snaplen: DEFAULT_SNAPLEN,
            promiscuous: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Set the BPF filter expression
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

/// An opened live capture, ready to stream frames
///
/// Not restartable: once `stream` consumes it, a new capture requires a
/// new `open`.
pub struct CaptureSource {
    device: String,
    device_index: u32,
    handle: Capture<Active>,
}

impl CaptureSource {
    /// Open a live capture on the configured device and apply the filter
    ///
    /// Fails with `CaptureOpen` if the device cannot be opened and with
    /// `Filter` if the BPF expression does not compile. Both failures are
    /// synchronous; no task is started.
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let mut handle = Capture::from_device(config.device.as_str())
            .map_err(|e| {
                Error::capture_open(format!("cannot use device '{}': {e}", config.device))
            })?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .open()
            .map_err(|e| {
                Error::capture_open(format!("cannot open device '{}': {e}", config.device))
            })?;

        let filter = config.filter.trim();
        if !filter.is_empty() {
            handle
                .filter(filter, true)
                .map_err(|e| Error::filter(format!("invalid BPF filter '{filter}': {e}")))?;
        }

        // Index is informational; 0 when the OS does not report one
        let device_index = interface::get_device(&config.device)
            .map(|d| d.index)
            .unwrap_or(0);

        info!(device = %config.device, filter = %filter, "capture opened");

        Ok(Self {
            device: config.device.clone(),
            device_index,
            handle,
        })
    }

    /// OS index of the device this capture runs on
    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    /// Stream captured frames until `stop` is set or the device fails
    ///
    /// The returned channel closes when the capture loop exits; that is
    /// the only termination signal downstream stages observe.
    pub fn stream(self, stop: Arc<AtomicBool>) -> mpsc::Receiver<RawFrame> {
        let (tx, rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let Self {
            device,
            device_index,
            mut handle,
        } = self;

        tokio::task::spawn_blocking(move || {
            loop {
                if stop.load(Ordering::Relaxed) {
                    debug!(device = %device, "capture cancelled");
                    break;
                }

                match handle.next_packet() {
                    Ok(packet) => {
                        let header = *packet.header;
                        let frame = RawFrame {
                            device_index,
                            timestamp: timeval_to_utc(
                                header.ts.tv_sec as i64,
                                header.ts.tv_usec as i64,
                            ),
                            wire_length: header.len,
                            captured_length: header.caplen,
                            data: packet.data.to_vec(),
                        };
                        if tx.blocking_send(frame).is_err() {
                            debug!(device = %device, "frame channel closed downstream");
                            break;
                        }
                    }
                    // Read timeout: no frames arrived, re-check the stop flag
                    Err(pcap::Error::TimeoutExpired) => continue,
                    Err(e) => {
                        error!(device = %device, error = %e, "capture read failed");
                        break;
                    }
                }
            }
            // handle drops here, closing the underlying device
        });

        rx
    }
}

fn timeval_to_utc(sec: i64, usec: i64) -> DateTime<Utc> {
    let nanos = (usec.clamp(0, 999_999) as u32) * 1000;
    Utc.timestamp_opt(sec, nanos).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_config_defaults() {
        let config = CaptureConfig::new("eth0");
        assert_eq!(config.device, "eth0");
        assert_eq!(config.snaplen, DEFAULT_SNAPLEN);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(!config.promiscuous);
        assert!(config.filter.is_empty());
    }

    #[test]
    fn test_open_missing_device_fails() {
        let config = CaptureConfig::new("nonexistent_interface_xyz");
        let result = CaptureSource::open(&config);
        assert!(matches!(result, Err(Error::CaptureOpen(_))));
    }

    #[test]
    fn test_open_invalid_filter_fails() {
        // Needs an openable device; skip quietly where privileges are missing
        if CaptureSource::open(&CaptureConfig::new("lo")).is_err() {
            println!("skipping: cannot open loopback (missing privileges?)");
            return;
        }

        let config = CaptureConfig::new("lo").with_filter("definitely not bpf !!!");
        assert!(matches!(
            CaptureSource::open(&config),
            Err(Error::Filter(_))
        ));
    }

    #[test]
    fn test_timeval_conversion() {
        let ts = timeval_to_utc(1_700_000_000, 250_000);
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_micros(), 250_000);
    }
}
