//! Background index refresh.
//!
//! One task owns every rebuild: once at startup, on each interval tick, and
//! on each dataset-changed event from the broker. Because a single task does
//! the building, concurrent triggers cannot interleave builds; a lagged event
//! stream collapses into one rebuild. The stale snapshot keeps serving until
//! the new one is published.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::broker::Broker;
use crate::search::SearchService;
use crate::shutdown::CancelToken;

pub struct IndexRefresher {
    service: Arc<SearchService>,
    broker: Broker,
    interval: Duration,
}

impl IndexRefresher {
    pub fn new(service: Arc<SearchService>, broker: Broker, interval: Duration) -> Self {
        Self {
            service,
            broker,
            interval,
        }
    }

    /// Spawn the refresh loop. It exits only when `cancel` fires.
    pub fn start(self, cancel: CancelToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, mut cancel: CancelToken) {
        // Holding a Broker clone keeps the channel open, so recv can only
        // fail by lagging.
        let mut events = self.broker.subscribe();

        self.rebuild("startup").await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // the first tick completes immediately

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("index refresher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.rebuild("tick").await;
                }
                received = events.recv() => {
                    match received {
                        Ok(event) => {
                            tracing::info!(topic = event.topic, payload = %event.payload, "dataset changed");
                            self.rebuild("event").await;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            // Back-to-back triggers coalesce into one rebuild.
                            tracing::warn!(skipped, "event stream lagged, rebuilding once");
                            self.rebuild("event").await;
                        }
                        Err(RecvError::Closed) => {
                            tracing::warn!("event stream closed");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn rebuild(&self, trigger: &str) {
        if let Err(err) = self.service.rebuild_index().await {
            tracing::error!(trigger, %err, "index rebuild failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Comic;
    use crate::repository::DbContext;
    use crate::search::InvertedIndex;
    use crate::shutdown;
    use crate::words::SnowballNormalizer;
    use chrono::Utc;
    use tempfile::tempdir;

    /// Poll the index-backed path until `phrase` yields `want` hits.
    async fn wait_for_hits(service: &SearchService, phrase: &str, want: usize) {
        for _ in 0..100 {
            if let Ok((hits, _)) = service.indexed_search(phrase, 10).await {
                if hits.len() == want {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("index did not reach {want} hits for {phrase:?} in time");
    }

    #[tokio::test]
    async fn rebuilds_at_startup_and_on_events() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.comics();

        repo.upsert(&Comic {
            id: 1,
            img_url: String::new(),
            title: vec!["fox".to_string()],
            alt: Vec::new(),
            words: Vec::new(),
            fetched_at: Utc::now(),
        })
        .await
        .unwrap();

        let service = Arc::new(SearchService::new(
            repo.clone(),
            Arc::new(SnowballNormalizer),
            Arc::new(InvertedIndex::new()),
        ));
        let broker = Broker::new();
        let (handle, token) = shutdown::channel();

        // A long interval keeps ticks out of the picture; only startup and
        // events can trigger rebuilds here.
        let refresher = IndexRefresher::new(Arc::clone(&service), broker.clone(), Duration::from_secs(3600));
        let task = refresher.start(token);

        // Startup rebuild picks up the pre-existing row.
        wait_for_hits(&service, "fox", 1).await;

        // New row becomes searchable only after a dataset-changed event.
        repo.upsert(&Comic {
            id: 2,
            img_url: String::new(),
            title: vec!["dog".to_string()],
            alt: Vec::new(),
            words: Vec::new(),
            fetched_at: Utc::now(),
        })
        .await
        .unwrap();
        broker.notify_db_updated();

        wait_for_hits(&service, "dog", 1).await;

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("refresher must stop on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn drop_then_event_empties_search_results() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.comics();

        repo.upsert(&Comic {
            id: 1,
            img_url: String::new(),
            title: vec!["fox".to_string()],
            alt: Vec::new(),
            words: Vec::new(),
            fetched_at: Utc::now(),
        })
        .await
        .unwrap();

        let service = Arc::new(SearchService::new(
            repo.clone(),
            Arc::new(SnowballNormalizer),
            Arc::new(InvertedIndex::new()),
        ));
        let broker = Broker::new();
        let (handle, token) = shutdown::channel();
        let task = IndexRefresher::new(Arc::clone(&service), broker.clone(), Duration::from_secs(3600))
            .start(token);

        wait_for_hits(&service, "fox", 1).await;

        repo.drop_all().await.unwrap();
        broker.notify_db_updated();

        wait_for_hits(&service, "fox", 0).await;
        let (hits, total) = service.indexed_search("fox", 10).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(total, 0);

        handle.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), task).await;
    }
}
