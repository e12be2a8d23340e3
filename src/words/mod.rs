//! Phrase normalization: raw text to ordered, deduplicated token lists.
//!
//! The contract: lowercase, split on non-alphanumeric runs, keep digit-only
//! runs verbatim, drop English stop-words, stem the rest, deduplicate
//! preserving first occurrence. Inputs over 4096 bytes are rejected.
//!
//! The trait seam exists so ingest and search can run against a remote
//! normalizer; the default implementation runs in-process.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

use crate::error::{Error, Result};

/// Longest accepted input, in bytes.
pub const MAX_PHRASE_LEN: usize = 4096;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("valid regex"));

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    // Snowball English stop-word list. Splitting on non-alphanumerics strips
    // apostrophes, so contractions arrive as fragments ("don", "t", "s").
    let words: &[&str] = &[
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
        "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
        "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
        "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
        "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
        "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
        "for", "with", "about", "against", "between", "into", "through", "during", "before",
        "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
        "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
        "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such",
        "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
        "will", "just", "don", "should", "now",
    ];
    words.iter().copied().collect()
});

/// Deterministic phrase-to-tokens normalization.
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn norm(&self, phrase: &str) -> Result<Vec<String>>;
}

/// In-process Snowball-stemming normalizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnowballNormalizer;

#[async_trait]
impl Normalizer for SnowballNormalizer {
    async fn norm(&self, phrase: &str) -> Result<Vec<String>> {
        if phrase.len() > MAX_PHRASE_LEN {
            return Err(Error::PhraseTooLarge);
        }

        let lowered = phrase.to_lowercase();
        let mut out = Vec::new();
        let mut seen = HashSet::new();

        for token in NON_ALNUM.split(&lowered) {
            if token.is_empty() {
                continue;
            }

            // Digit-only runs stay verbatim: no stop-word check, no stemming.
            if token.bytes().all(|b| b.is_ascii_digit()) {
                if seen.insert(token.to_string()) {
                    out.push(token.to_string());
                }
                continue;
            }

            if STOP_WORDS.contains(token) {
                continue;
            }

            let stem = STEMMER.stem(token).to_string();
            let stem = if stem.is_empty() {
                token.to_string()
            } else {
                stem
            };
            if seen.insert(stem.clone()) {
                out.push(stem);
            }
        }

        Ok(out)
    }
}
