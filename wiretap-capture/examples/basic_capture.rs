//! Example: Basic live capture
//!
//! Streams raw frames from a device for ten seconds or 20 frames,
//! whichever comes first. Requires root/administrator privileges.
//!
//! Run with: sudo cargo run --example basic_capture -- <device>

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiretap_capture::{CaptureConfig, CaptureSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let device = std::env::args().nth(1).unwrap_or_else(|| "lo".to_string());
    println!("Capturing on: {device}");

    let source = CaptureSource::open(&CaptureConfig::new(&device))?;

    let stop = Arc::new(AtomicBool::new(false));
    let mut frames = source.stream(stop.clone());

    let mut count = 0usize;
    let deadline = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    count += 1;
                    println!(
                        "[{count}] {} bytes at {} (wire {})",
                        frame.data.len(),
                        frame.timestamp,
                        frame.wire_length
                    );
                    if count >= 20 {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut deadline => break,
        }
    }

    stop.store(true, Ordering::Relaxed);
    println!("captured {count} frame(s)");

    Ok(())
}
