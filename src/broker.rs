//! In-process event bus.
//!
//! One broadcast topic carries "dataset changed" notifications from the
//! ingest side to the index refresher. Receivers treat any message as
//! "rebuild now"; the payload is an opaque human-readable marker.

use tokio::sync::broadcast;

/// Topic published after a successful Update or Drop.
pub const TOPIC_DB_UPDATED: &str = "xkcd.db.updated";

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct Event {
    pub topic: &'static str,
    pub payload: String,
}

/// Cloneable handle to the bus. Clones share the underlying channel, so the
/// channel stays open for as long as any handle lives.
#[derive(Clone)]
pub struct Broker {
    tx: broadcast::Sender<Event>,
}

impl Broker {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publish a dataset-changed event. Send failures (no live subscribers)
    /// are logged, never propagated.
    pub fn notify_db_updated(&self) {
        let event = Event {
            topic: TOPIC_DB_UPDATED,
            payload: "xkcd database has been updated".to_string(),
        };
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::info!(topic = TOPIC_DB_UPDATED, receivers, "db updated event published");
            }
            Err(err) => {
                tracing::warn!(topic = TOPIC_DB_UPDATED, %err, "no subscribers for db updated event");
            }
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}
