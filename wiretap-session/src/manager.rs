//! Session lifecycle manager
//!
//! Owns the registry of active capture sessions and wires the pipeline
//! for each one: capture stream, decode stage, format stage, sink.
//! Only the capture loop observes the stop flag; every downstream stage
//! terminates because its input channel closes, so closing the head of
//! the pipeline drains the tail.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use wiretap_capture::{CaptureSource, FRAME_QUEUE_DEPTH};
use wiretap_core::{Error, Result, SessionId, SessionStats, SessionStatsCounters};
use wiretap_decode::decode;
use wiretap_stream::{Broadcaster, Sink};

use crate::config::{OutputTarget, SessionConfig};

/// One tracked capture session
struct Session {
    config: SessionConfig,
    stop: Arc<AtomicBool>,
    stats: Arc<SessionStatsCounters>,
    started_at: DateTime<Utc>,
    broadcaster: Option<Arc<Broadcaster>>,
}

/// Point-in-time description of an active session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub device: String,
    pub filter: String,
    pub format: String,
    pub output: String,
    pub started_at: DateTime<Utc>,
    pub stats: SessionStats,
}

/// Manager that tracks and controls concurrent capture sessions
///
/// Construct one instance at process start and share it by reference;
/// sessions live only as long as the owning instance.
pub struct SessionManager {
    /// Shared with pipeline tasks so a fatal sink error can self-close
    sessions: Arc<DashMap<SessionId, Session>>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new() -> Self {
        info!("creating session manager");
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Start a capture session and return its id
    ///
    /// The capture handle and the sink destination are acquired before
    /// anything is spawned, so open, filter and file-creation failures
    /// are returned synchronously and leave no session behind. On
    /// success the pipeline runs as independent tasks until the session
    /// is closed or its device stops delivering frames.
    pub async fn start_session(&self, config: SessionConfig) -> Result<SessionId> {
        let source = CaptureSource::open(&config.capture_config())?;

        let (sink, broadcaster) = match &config.output {
            OutputTarget::File(path) => (Sink::file(path).await?, None),
            OutputTarget::Broadcast => {
                let broadcaster = Arc::new(Broadcaster::new());
                (Sink::broadcast(broadcaster.clone()), Some(broadcaster))
            }
        };

        let id = SessionId::generate();
        let stop = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(SessionStatsCounters::default());

        info!(
            id = %id,
            device = %config.device,
            filter = %config.filter,
            format = %config.format,
            output = %config.output,
            "starting session"
        );

        let format = config.format;
        let session = Session {
            config,
            stop: stop.clone(),
            stats: stats.clone(),
            started_at: Utc::now(),
            broadcaster,
        };
        // Registered before the pipeline spawns so a self-closing
        // pipeline always finds its own entry
        self.sessions.insert(id, session);

        // capture -> decode
        let mut raw_frames = source.stream(stop.clone());
        let (record_tx, record_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let decode_stats = stats.clone();
        tokio::spawn(async move {
            while let Some(frame) = raw_frames.recv().await {
                decode_stats.record_frame_captured();
                if record_tx.send(decode(&frame)).await.is_err() {
                    break;
                }
            }
        });

        // decode -> format
        let frames = format.spawn(record_rx, stats.clone());

        // format -> sink; a fatal sink error closes this session only
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            match sink.consume(frames, stats).await {
                Ok(()) => debug!(id = %id, "session pipeline drained"),
                Err(e) => {
                    error!(id = %id, error = %e, "session pipeline aborted");
                    stop.store(true, Ordering::Relaxed);
                    sessions.remove(&id);
                }
            }
        });

        Ok(id)
    }

    /// Close a session
    ///
    /// Cancels the capture and removes the registry entry without
    /// waiting for the pipeline to drain; downstream stages terminate as
    /// their input channels close. Fails with `SessionNotFound` for ids
    /// never issued or already closed.
    pub fn close_session(&self, id: SessionId) -> Result<()> {
        let (_, session) = self
            .sessions
            .remove(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;

        // The entry is removed at most once, and the cancel with it
        session.stop.store(true, Ordering::Relaxed);
        info!(id = %id, "session closed");
        Ok(())
    }

    /// The broadcaster of a broadcasting session
    ///
    /// Fails with `SessionNotFound` for unknown ids and with a
    /// configuration error for sessions writing to a file.
    pub fn broadcaster(&self, id: SessionId) -> Result<Arc<Broadcaster>> {
        let session = self
            .sessions
            .get(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;

        session
            .broadcaster
            .clone()
            .ok_or_else(|| Error::config(format!("session '{id}' does not broadcast")))
    }

    /// Describe one active session
    pub fn get_info(&self, id: SessionId) -> Option<SessionInfo> {
        self.sessions.get(&id).map(|session| session_info(id, &session))
    }

    /// Describe all active sessions, oldest first
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| session_info(*entry.key(), entry.value()))
            .collect();
        infos.sort_by_key(|info| info.started_at);
        infos
    }

    /// Number of active sessions
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Close every active session
    pub fn stop_all(&self) {
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Err(e) = self.close_session(id) {
                warn!(id = %id, error = %e, "session vanished during stop_all");
            }
        }
        info!("all sessions stopped");
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        for entry in self.sessions.iter() {
            entry.value().stop.store(true, Ordering::Relaxed);
        }
    }
}

fn session_info(id: SessionId, session: &Session) -> SessionInfo {
    SessionInfo {
        id,
        device: session.config.device.clone(),
        filter: session.config.filter.clone(),
        format: session.config.format.to_string(),
        output: session.config.output.to_string(),
        started_at: session.started_at,
        stats: session.stats.to_stats(session.started_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiretap_stream::Formatter;

    fn loopback_config(output: OutputTarget) -> SessionConfig {
        SessionConfig::new("lo")
            .with_filter("tcp")
            .with_format(Formatter::Text)
            .with_output(output)
    }

    /// Try to start a loopback session; None when the environment lacks
    /// capture privileges
    async fn try_start(manager: &SessionManager, config: SessionConfig) -> Option<SessionId> {
        match manager.start_session(config).await {
            Ok(id) => Some(id),
            Err(e) => {
                println!("skipping: cannot capture on loopback: {e}");
                None
            }
        }
    }

    #[tokio::test]
    async fn test_close_unknown_session() {
        let manager = SessionManager::new();
        let result = manager.close_session(SessionId::generate());
        assert!(matches!(result, Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_broadcaster_of_unknown_session() {
        let manager = SessionManager::new();
        let result = manager.broadcaster(SessionId::generate());
        assert!(matches!(result, Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_manager_lists_nothing() {
        let manager = SessionManager::new();
        assert_eq!(manager.active_count(), 0);
        assert!(manager.list().is_empty());
        manager.stop_all();
    }

    #[tokio::test]
    async fn test_start_session_bad_device() {
        let manager = SessionManager::new();
        let config = SessionConfig::new("nonexistent_interface_xyz");
        let result = manager.start_session(config).await;
        assert!(matches!(result, Err(Error::CaptureOpen(_))));
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_session_ids_distinct_and_tracked() {
        let manager = SessionManager::new();
        let dir = tempfile::tempdir().unwrap();

        let Some(a) = try_start(
            &manager,
            loopback_config(OutputTarget::File(dir.path().join("a.txt"))),
        )
        .await
        else {
            return;
        };
        let b = try_start(
            &manager,
            loopback_config(OutputTarget::File(dir.path().join("b.txt"))),
        )
        .await
        .unwrap();

        assert_ne!(a, b);
        assert_eq!(manager.active_count(), 2);

        let info = manager.get_info(a).unwrap();
        assert_eq!(info.device, "lo");
        assert_eq!(info.filter, "tcp");

        manager.close_session(a).unwrap();
        assert_eq!(manager.active_count(), 1);
        assert!(matches!(
            manager.close_session(a),
            Err(Error::SessionNotFound(_))
        ));

        manager.stop_all();
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_session_exposes_broadcaster() {
        let manager = SessionManager::new();

        let Some(id) = try_start(&manager, loopback_config(OutputTarget::Broadcast)).await
        else {
            return;
        };

        let broadcaster = manager.broadcaster(id).unwrap();
        let subscriber = broadcaster.attach();
        assert_eq!(broadcaster.subscriber_count(), 1);
        broadcaster.detach(subscriber.id);

        manager.close_session(id).unwrap();
        assert!(matches!(
            manager.broadcaster(id),
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_file_session_has_no_broadcaster() {
        let manager = SessionManager::new();
        let dir = tempfile::tempdir().unwrap();

        let Some(id) = try_start(
            &manager,
            loopback_config(OutputTarget::File(dir.path().join("out.txt"))),
        )
        .await
        else {
            return;
        };

        assert!(matches!(manager.broadcaster(id), Err(Error::Config(_))));
        manager.close_session(id).unwrap();
    }

    /// End-to-end: loopback capture into a text file, then close and
    /// check every block in the output is well formed
    #[tokio::test]
    async fn test_capture_to_file_end_to_end() {
        let manager = SessionManager::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.txt");

        let mut config = loopback_config(OutputTarget::File(path.clone()));
        config.snaplen = 1600;
        config.promiscuous = true;

        let Some(id) = try_start(&manager, config).await else {
            return;
        };

        // Give the pipeline a moment; traffic may or may not arrive
        tokio::time::sleep(Duration::from_millis(300)).await;
        manager.close_session(id).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        for block in contents.split("PACKET: ").skip(1) {
            assert!(block.contains("Length: "), "malformed block: {block:?}");
        }
    }
}
