//! Multi-subscriber frame broadcaster
//!
//! Distributes every frame handed to it to all currently attached
//! subscribers, accepting and releasing subscribers while broadcasting is
//! in progress. Sending is non-blocking: a subscriber whose queue is
//! saturated is disconnected and its frame dropped, so one stalled
//! consumer never stalls the producer or unrelated subscribers.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

/// Frames buffered per subscriber
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 8;

/// Handle held by one attached consumer
///
/// Read frames from `frames` until it closes; the owning transport task
/// must call `Broadcaster::detach` exactly once when it is done.
pub struct Subscriber {
    pub id: Uuid,
    pub frames: mpsc::Receiver<Bytes>,
}

/// Fan-out point between one producing session and its live consumers
#[derive(Default)]
pub struct Broadcaster {
    subscribers: RwLock<HashMap<Uuid, mpsc::Sender<Bytes>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and hand back its queue
    pub fn attach(&self) -> Subscriber {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let id = Uuid::new_v4();
        self.subscribers.write().insert(id, tx);
        debug!(subscriber = %id, "subscriber attached");
        Subscriber { id, frames: rx }
    }

    /// Remove a subscriber; idempotent
    pub fn detach(&self, id: Uuid) {
        if self.subscribers.write().remove(&id).is_some() {
            debug!(subscriber = %id, "subscriber detached");
        }
    }

    /// Send one frame to every attached subscriber
    ///
    /// Every subscriber still attached when this returns has received the
    /// frame in order relative to its other frames. A subscriber whose
    /// queue is full or whose receiver is gone is disconnected instead.
    pub fn send(&self, frame: &Bytes) {
        let mut dead = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for (id, tx) in subscribers.iter() {
                match tx.try_send(frame.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(subscriber = %id, "subscriber queue saturated, disconnecting");
                        dead.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => dead.push(*id),
                }
            }
        }
        for id in dead {
            self.detach(id);
        }
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fanout_reaches_all_subscribers() {
        let broadcaster = Broadcaster::new();
        let mut a = broadcaster.attach();
        let mut b = broadcaster.attach();
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.send(&Bytes::from_static(b"frame"));

        assert_eq!(a.frames.recv().await.unwrap(), "frame");
        assert_eq!(b.frames.recv().await.unwrap(), "frame");
    }

    #[tokio::test]
    async fn test_order_preserved_per_subscriber() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.attach();

        for frame in ["one", "two", "three"] {
            broadcaster.send(&Bytes::from(frame));
        }

        assert_eq!(sub.frames.recv().await.unwrap(), "one");
        assert_eq!(sub.frames.recv().await.unwrap(), "two");
        assert_eq!(sub.frames.recv().await.unwrap(), "three");
    }

    #[tokio::test]
    async fn test_detach_is_idempotent() {
        let broadcaster = Broadcaster::new();
        let sub = broadcaster.attach();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.detach(sub.id);
        broadcaster.detach(sub.id);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_detached_subscriber_receives_nothing_more() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.attach();

        broadcaster.send(&Bytes::from_static(b"before"));
        broadcaster.detach(sub.id);
        broadcaster.send(&Bytes::from_static(b"after"));

        assert_eq!(sub.frames.recv().await.unwrap(), "before");
        // Channel closes with the sender side dropped at detach
        assert!(sub.frames.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_saturated_subscriber_is_disconnected() {
        let broadcaster = Broadcaster::new();
        let _stalled = broadcaster.attach();

        // Fill the stalled subscriber's queue, then one more
        for _ in 0..=SUBSCRIBER_QUEUE_DEPTH {
            broadcaster.send(&Bytes::from_static(b"x"));
        }

        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_peers() {
        let broadcaster = Broadcaster::new();
        let _stalled = broadcaster.attach();
        let mut active = broadcaster.attach();

        // The stalled subscriber saturates and gets dropped; the active one
        // keeps draining and stays attached.
        for i in 0..100u32 {
            broadcaster.send(&Bytes::from(i.to_string()));
            while let Ok(frame) = active.frames.try_recv() {
                drop(frame);
            }
        }

        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_cleaned_up() {
        let broadcaster = Broadcaster::new();
        let sub = broadcaster.attach();
        drop(sub);

        broadcaster.send(&Bytes::from_static(b"x"));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
