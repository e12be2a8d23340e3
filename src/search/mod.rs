//! Search: inverted index, ranked query paths and background refresh.

mod index;
mod refresher;
mod service;

pub use index::InvertedIndex;
pub use refresher::IndexRefresher;
pub use service::{SearchService, DEFAULT_LIMIT, MAX_LIMIT};
