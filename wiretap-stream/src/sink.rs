//! Output sinks: terminal consumers of a formatted frame stream

use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::debug;
use wiretap_core::{Error, Result, SessionStatsCounters};

use crate::broadcast::Broadcaster;

/// Terminal consumer of one session's output frames
pub enum Sink {
    /// Write each frame plus a trailing newline to a file
    File(File),
    /// Fan each frame out to the broadcaster's subscribers
    Broadcast(Arc<Broadcaster>),
}

impl Sink {
    /// Open a file sink, creating or truncating the destination
    pub async fn file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref()).await?;
        debug!(path = %path.as_ref().display(), "file sink opened");
        Ok(Sink::File(file))
    }

    /// Create a broadcast sink delivering into the given broadcaster
    pub fn broadcast(broadcaster: Arc<Broadcaster>) -> Self {
        Sink::Broadcast(broadcaster)
    }

    /// Consume frames until the input channel closes or a fatal error
    ///
    /// A file write failure is fatal (`SinkWrite`) and aborts the owning
    /// session's pipeline. Broadcast delivery never fails the session; a
    /// failing subscriber only gets disconnected by the broadcaster.
    pub async fn consume(
        self,
        mut frames: mpsc::Receiver<Bytes>,
        stats: Arc<SessionStatsCounters>,
    ) -> Result<()> {
        match self {
            Sink::File(mut file) => {
                while let Some(frame) = frames.recv().await {
                    write_frame(&mut file, &frame)
                        .await
                        .map_err(|e| Error::SinkWrite(e.to_string()))?;
                    stats.record_delivered(frame.len() as u64);
                }
                // Input exhausted: flush and let the handle close on drop
                file.flush()
                    .await
                    .map_err(|e| Error::SinkWrite(e.to_string()))?;
                Ok(())
            }
            Sink::Broadcast(broadcaster) => {
                while let Some(frame) = frames.recv().await {
                    stats.record_delivered(frame.len() as u64);
                    broadcaster.send(&frame);
                }
                Ok(())
            }
        }
    }
}

async fn write_frame(file: &mut File, frame: &Bytes) -> std::io::Result<()> {
    file.write_all(frame).await?;
    file.write_all(b"\n").await
}
