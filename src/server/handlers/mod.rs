//! HTTP request handlers.

mod auth;
mod comics;
mod db;
mod favorites;
mod ping;
mod search;

pub use auth::{admin_login, login, register, tg_login};
pub use comics::{comic_by_id, comics_list, comics_random};
pub use db::{db_drop, db_stats, db_status, db_update};
pub use favorites::{favorites_add, favorites_delete, favorites_list};
pub use ping::ping;
pub use search::{indexed_search, search};

use serde::Serialize;

use crate::models::Comic;

/// Comic as exposed over the API: id and image URL only.
#[derive(Debug, Serialize)]
pub struct ComicResponse {
    pub id: i64,
    pub url: String,
}

impl From<Comic> for ComicResponse {
    fn from(comic: Comic) -> Self {
        Self {
            id: comic.id,
            url: comic.img_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub comics: Vec<ComicResponse>,
    pub total: u32,
}

impl SearchResponse {
    pub fn new(comics: Vec<Comic>, total: u32) -> Self {
        Self {
            comics: comics.into_iter().map(ComicResponse::from).collect(),
            total,
        }
    }
}
