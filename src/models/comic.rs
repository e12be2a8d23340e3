//! Comic document model and ingest/dataset status types.
//!
//! A comic's textual fields are stored as ordered token sequences produced by
//! the normalizer, not as raw prose. Absent text is an empty sequence, never
//! null.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored comic document. `id` equals the upstream catalog number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comic {
    pub id: i64,
    /// Image URL; empty for placeholder entries.
    pub img_url: String,
    /// Normalized title tokens.
    pub title: Vec<String>,
    /// Normalized alt-text tokens.
    pub alt: Vec<String>,
    /// Normalized transcript tokens.
    pub words: Vec<String>,
    /// Time of the last successful upsert.
    pub fetched_at: DateTime<Utc>,
}

impl Comic {
    /// A row recording that id `n` was attempted but the catalog returned
    /// not-found. Future updates skip ids that already have a row.
    pub fn placeholder(id: i64) -> Self {
        Self {
            id,
            img_url: String::new(),
            title: Vec::new(),
            alt: Vec::new(),
            words: Vec::new(),
            fetched_at: Utc::now(),
        }
    }
}

/// Raw catalog entry as fetched from the remote source, before normalization.
#[derive(Debug, Clone)]
pub struct ComicInfo {
    pub id: i64,
    pub img_url: String,
    pub title: String,
    pub alt: String,
    pub transcript: String,
}

/// Aggregate statistics over the stored dataset.
///
/// `words_total`/`words_unique` count the `words` column only; title and alt
/// tokens are deliberately excluded.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DbStats {
    pub words_total: i64,
    pub words_unique: i64,
    pub comics_fetched: i64,
}

/// Dataset statistics plus the catalog's current latest id.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServiceStats {
    pub words_total: i64,
    pub words_unique: i64,
    pub comics_fetched: i64,
    pub comics_total: i64,
}

/// Observable ingest engine state. There is no intermediate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    Idle,
    Running,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }
}
