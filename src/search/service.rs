//! Search service: two query paths sharing one deterministic ranker.
//!
//! `find` pulls candidates from the database (token-overlap query);
//! `indexed_search` pulls them from the in-memory inverted index. Both rank
//! identically, so for the same data they return the same ordered ids.

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;

use crate::error::{Error, Result};
use crate::models::Comic;
use crate::repository::ComicRepository;
use crate::search::InvertedIndex;
use crate::words::Normalizer;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

const WEIGHT_TITLE: i64 = 5;
const WEIGHT_ALT: i64 = 3;
const WEIGHT_WORDS: i64 = 1;

/// A query term matched anywhere in a document outranks any combination of
/// field weights, so documents covering more query terms always come first.
const WEIGHT_COVERED: i64 = 100;

pub struct SearchService {
    db: ComicRepository,
    words: Arc<dyn Normalizer>,
    index: Arc<InvertedIndex>,
}

impl SearchService {
    pub fn new(db: ComicRepository, words: Arc<dyn Normalizer>, index: Arc<InvertedIndex>) -> Self {
        Self { db, words, index }
    }

    /// Rebuild the inverted index from the full stored document set.
    pub async fn rebuild_index(&self) -> Result<()> {
        let comics = self.db.all().await?;
        tracing::debug!(documents = comics.len(), "rebuilding inverted index");
        self.index.build(comics);
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.count().await.map(|_| ())
    }

    /// Ranked keyword search over the database.
    pub async fn find(&self, phrase: &str, limit: u32) -> Result<Vec<Comic>> {
        let (tokens, limit) = self.prepare(phrase, limit).await?;
        let candidates = self.db.find_by_tokens(&tokens).await?;
        let (ranked, _total) = rank(candidates, &tokens, limit);
        Ok(ranked)
    }

    /// Ranked keyword search over the in-memory index. Also returns the
    /// number of matching documents before the limit was applied.
    pub async fn indexed_search(&self, phrase: &str, limit: u32) -> Result<(Vec<Comic>, u32)> {
        let (tokens, limit) = self.prepare(phrase, limit).await?;

        let ids = self.index.docs_for_tokens(&tokens);
        if ids.is_empty() {
            return Ok((Vec::new(), 0));
        }
        let candidates = self.index.docs_by_ids(&ids);
        Ok(rank(candidates, &tokens, limit))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Comic> {
        if id <= 0 {
            return Err(Error::BadArguments);
        }
        self.db.get(id).await?.ok_or(Error::NotFound)
    }

    /// One uniformly chosen stored comic.
    pub async fn random(&self) -> Result<Comic> {
        let count = self.db.count().await?;
        if count == 0 {
            return Err(Error::NotFound);
        }
        let offset = rand::rng().random_range(0..count);
        self.db
            .page(offset, 1)
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NotFound)
    }

    /// One page of comics in ascending id order, plus the total count.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Comic>, u32)> {
        if page == 0 || per_page == 0 {
            return Err(Error::BadArguments);
        }
        let total = self.db.count().await?;
        let offset = i64::from(page - 1) * i64::from(per_page);
        let comics = self.db.page(offset, i64::from(per_page)).await?;
        Ok((comics, total as u32))
    }

    /// Shared validation and normalization for both query paths.
    async fn prepare(&self, phrase: &str, limit: u32) -> Result<(Vec<String>, u32)> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Err(Error::EmptyPhrase);
        }
        let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        if limit > MAX_LIMIT {
            return Err(Error::LimitTooLarge);
        }

        let tokens = self.words.norm(phrase).await?;
        if tokens.is_empty() {
            return Err(Error::UnnormalizablePhrase);
        }
        Ok((tokens, limit))
    }
}

/// Score, order and truncate candidates. Returns the kept documents and the
/// number of keepers before truncation.
fn rank(candidates: Vec<Comic>, tokens: &[String], limit: u32) -> (Vec<Comic>, u32) {
    let mut scored: Vec<(i64, Comic)> = candidates
        .into_iter()
        .filter_map(|comic| {
            let score = score_comic(&comic, tokens);
            (score > 0).then_some((score, comic))
        })
        .collect();

    let total = scored.len() as u32;

    // Score descending, id ascending on ties. The tie-break is load-bearing
    // for determinism across the two query paths.
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
    scored.truncate(limit as usize);

    (scored.into_iter().map(|(_, comic)| comic).collect(), total)
}

fn score_comic(comic: &Comic, tokens: &[String]) -> i64 {
    let title_set = token_set(&comic.title);
    let alt_set = token_set(&comic.alt);
    let words_set = token_set(&comic.words);

    let mut covered = 0i64;
    let mut title_matches = 0i64;
    let mut alt_matches = 0i64;
    let mut words_matches = 0i64;

    for token in tokens {
        let mut matched = false;
        if title_set.contains(token.as_str()) {
            title_matches += 1;
            matched = true;
        }
        if alt_set.contains(token.as_str()) {
            alt_matches += 1;
            matched = true;
        }
        if words_set.contains(token.as_str()) {
            words_matches += 1;
            matched = true;
        }
        if matched {
            covered += 1;
        }
    }

    if covered == 0 {
        return 0;
    }
    covered * WEIGHT_COVERED
        + title_matches * WEIGHT_TITLE
        + alt_matches * WEIGHT_ALT
        + words_matches * WEIGHT_WORDS
}

fn token_set(tokens: &[String]) -> HashSet<&str> {
    tokens
        .iter()
        .filter(|t| !t.is_empty())
        .map(String::as_str)
        .collect()
}
