//! Ingest engine: concurrent, idempotent catalog crawl.
//!
//! `update` fetches every catalog entry not yet stored, normalizes its three
//! textual fields and upserts the result. `update` and `drop_all` share one
//! atomic gate so at most one of them runs per process; `status` reports the
//! gate. Per-id failures never abort a batch; coverage is eventual across
//! repeated updates.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::catalog::CatalogClient;
use crate::error::{Error, Result};
use crate::models::{Comic, IngestStatus, ServiceStats};
use crate::repository::ComicRepository;
use crate::shutdown::CancelToken;
use crate::words::Normalizer;

/// Upper bound on the worker pool, whatever the configuration says.
const MAX_WORKERS: usize = 64;

pub struct IngestService {
    db: ComicRepository,
    catalog: Arc<dyn CatalogClient>,
    words: Arc<dyn Normalizer>,
    concurrency: usize,
    running: AtomicBool,
}

impl std::fmt::Debug for IngestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestService")
            .field("concurrency", &self.concurrency)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

/// Releases the ingest gate on every exit path, panics included.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl IngestService {
    pub fn new(
        db: ComicRepository,
        catalog: Arc<dyn CatalogClient>,
        words: Arc<dyn Normalizer>,
        concurrency: usize,
    ) -> Result<Self> {
        if concurrency < 1 {
            return Err(Error::BadArguments);
        }
        Ok(Self {
            db,
            catalog,
            words,
            concurrency,
            running: AtomicBool::new(false),
        })
    }

    fn acquire(&self) -> Result<RunGuard<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }
        Ok(RunGuard {
            running: &self.running,
        })
    }

    /// Fetch and store every catalog entry not yet present.
    ///
    /// Returns `AlreadyRunning` if an update or drop holds the gate,
    /// `Unavailable` if the latest-id fetch or the stored-ids read fails,
    /// `Cancelled` if the token fires mid-run. Individual ids that fail are
    /// logged and retried on the next update.
    pub async fn update(&self, cancel: CancelToken) -> Result<()> {
        let _guard = self.acquire()?;

        let latest = self.catalog.latest_id().await?;
        let have: HashSet<i64> = self
            .db
            .ids()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?
            .into_iter()
            .collect();

        let workers = self.concurrency.min(MAX_WORKERS);
        tracing::info!(latest, known = have.len(), workers, "update started");

        // Bounded queue: the producer blocks when workers fall behind.
        let (tx, rx) = mpsc::channel::<i64>(workers * 2);
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = Arc::clone(&rx);
            let db = self.db.clone();
            let catalog = Arc::clone(&self.catalog);
            let words = Arc::clone(&self.words);
            let mut cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let id = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            _ = cancel.cancelled() => None,
                            id = rx.recv() => id,
                        }
                    };
                    let Some(id) = id else { break };
                    process_id(&db, catalog.as_ref(), words.as_ref(), id).await;
                }
            }));
        }

        let mut cancel_producer = cancel.clone();
        let mut cancelled = false;
        for id in 1..=latest {
            if have.contains(&id) {
                continue;
            }
            tokio::select! {
                _ = cancel_producer.cancelled() => {
                    cancelled = true;
                    break;
                }
                sent = tx.send(id) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        // Closing the queue lets idle workers drain and exit.
        drop(tx);
        for handle in handles {
            let _ = handle.await;
        }

        // A cancel can also surface as a send failure once every worker has
        // bailed out; the token is the source of truth.
        if cancel.is_cancelled() {
            cancelled = true;
        }
        if cancelled {
            tracing::info!("update cancelled");
            return Err(Error::Cancelled);
        }
        tracing::info!("update finished");
        Ok(())
    }

    /// Empty the store. Shares the gate with `update`; no partial drop.
    pub async fn drop_all(&self) -> Result<()> {
        let _guard = self.acquire()?;
        self.db.drop_all().await?;
        tracing::info!("comics dropped");
        Ok(())
    }

    pub fn status(&self) -> IngestStatus {
        if self.running.load(Ordering::SeqCst) {
            IngestStatus::Running
        } else {
            IngestStatus::Idle
        }
    }

    pub async fn stats(&self) -> Result<ServiceStats> {
        let db = self.db.stats().await?;
        let total = self.catalog.latest_id().await?;
        Ok(ServiceStats {
            words_total: db.words_total,
            words_unique: db.words_unique,
            comics_fetched: db.comics_fetched,
            comics_total: total,
        })
    }
}

/// Fetch, normalize and store one id. Never fails the batch: not-found
/// becomes a placeholder row, anything else is logged and skipped.
async fn process_id(
    db: &ComicRepository,
    catalog: &dyn CatalogClient,
    words: &dyn Normalizer,
    id: i64,
) {
    let info = match catalog.get(id).await {
        Ok(info) => info,
        Err(Error::NotFound) => {
            // Record the attempt so future updates skip this id.
            if let Err(err) = db.upsert(&Comic::placeholder(id)).await {
                tracing::warn!(id, %err, "store placeholder failed");
            }
            return;
        }
        Err(err) => {
            tracing::warn!(id, %err, "catalog fetch failed, will retry next update");
            return;
        }
    };

    let title = norm_or_empty(words, &info.title, id, "title").await;
    let alt = norm_or_empty(words, &info.alt, id, "alt").await;
    let word_tokens = norm_or_empty(words, &info.transcript, id, "transcript").await;

    let comic = Comic {
        id: info.id,
        img_url: info.img_url,
        title,
        alt,
        words: word_tokens,
        fetched_at: chrono::Utc::now(),
    };
    if let Err(err) = db.upsert(&comic).await {
        tracing::warn!(id, %err, "store upsert failed");
    }
}

/// A failed normalization degrades the field to empty; the document is still
/// stored.
async fn norm_or_empty(words: &dyn Normalizer, raw: &str, id: i64, field: &str) -> Vec<String> {
    match words.norm(raw).await {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::warn!(id, field, %err, "normalize failed, storing empty");
            Vec::new()
        }
    }
}
