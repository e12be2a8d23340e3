//! In-memory inverted index over the comic documents.
//!
//! A build constructs a complete snapshot offline and swaps it in under a
//! short write lock, so readers always observe either the previous snapshot
//! or the new one. There is no incremental mutation; drop-and-rebuild is the
//! only write.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;

use crate::models::Comic;

#[derive(Default)]
struct Snapshot {
    /// token -> ids of documents containing it (one posting per document).
    by_token: HashMap<String, Vec<i64>>,
    /// id -> full document, for hydration after a posting-list lookup.
    docs: HashMap<i64, Comic>,
}

#[derive(Default)]
pub struct InvertedIndex {
    snapshot: RwLock<Snapshot>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot with one built from `comics`.
    ///
    /// Tokens are deduplicated per document: a token appearing in several
    /// fields (or several times in one field) contributes a single posting.
    pub fn build(&self, comics: Vec<Comic>) {
        let mut by_token: HashMap<String, Vec<i64>> = HashMap::with_capacity(comics.len() * 4);
        let mut docs: HashMap<i64, Comic> = HashMap::with_capacity(comics.len());

        for comic in comics {
            {
                let mut seen: HashSet<&str> = HashSet::with_capacity(
                    comic.title.len() + comic.alt.len() + comic.words.len(),
                );
                for token in comic
                    .title
                    .iter()
                    .chain(comic.alt.iter())
                    .chain(comic.words.iter())
                {
                    if token.is_empty() {
                        continue;
                    }
                    if seen.insert(token) {
                        by_token.entry(token.clone()).or_default().push(comic.id);
                    }
                }
            }
            docs.insert(comic.id, comic);
        }

        *self.snapshot.write() = Snapshot { by_token, docs };
    }

    /// Union of posting lists for `tokens`, ascending and deduplicated.
    pub fn docs_for_tokens(&self, tokens: &[String]) -> Vec<i64> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let snapshot = self.snapshot.read();
        let mut ids = BTreeSet::new();
        for token in tokens {
            if let Some(postings) = snapshot.by_token.get(token) {
                ids.extend(postings.iter().copied());
            }
        }
        ids.into_iter().collect()
    }

    /// Documents for `ids`; unknown ids are silently dropped.
    pub fn docs_by_ids(&self, ids: &[i64]) -> Vec<Comic> {
        let snapshot = self.snapshot.read();
        ids.iter()
            .filter_map(|id| snapshot.docs.get(id).cloned())
            .collect()
    }
}
