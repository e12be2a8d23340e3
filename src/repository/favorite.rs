//! Favorites repository: per-user comic bookmarks.
//!
//! Uniqueness of `(user_id, comic_id)` lives in the table's composite
//! primary key; callers see a violation as `AlreadyExists`.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::context::Database;
use super::parse_datetime;
use crate::error::{Error, Result};
use crate::models::Favorite;
use crate::schema::favorites;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = favorites)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct FavoriteRecord {
    #[allow(dead_code)]
    user_id: i64,
    comic_id: i64,
    created_at: String,
}

#[derive(Clone)]
pub struct FavoriteRepository {
    db: Database,
}

impl FavoriteRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn add(&self, user_id: i64, comic_id: i64) -> Result<()> {
        let mut conn = self.db.connect().await?;
        diesel::insert_into(favorites::table)
            .values((
                favorites::user_id.eq(user_id),
                favorites::comic_id.eq(comic_id),
                favorites::created_at.eq(Utc::now().to_rfc3339()),
            ))
            .execute(&mut conn)
            .await
            .map_err(|err| {
                if Error::is_unique_violation(&err) {
                    Error::AlreadyExists
                } else {
                    Error::from(err)
                }
            })?;
        Ok(())
    }

    pub async fn delete(&self, user_id: i64, comic_id: i64) -> Result<()> {
        let mut conn = self.db.connect().await?;
        let rows = diesel::delete(
            favorites::table
                .filter(favorites::user_id.eq(user_id))
                .filter(favorites::comic_id.eq(comic_id)),
        )
        .execute(&mut conn)
        .await?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// A user's bookmarks, newest first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Favorite>> {
        let mut conn = self.db.connect().await?;
        let records = favorites::table
            .filter(favorites::user_id.eq(user_id))
            .order(favorites::created_at.desc())
            .load::<FavoriteRecord>(&mut conn)
            .await?;
        Ok(records
            .into_iter()
            .map(|r| Favorite {
                comic_id: r.comic_id,
                created_at: parse_datetime(&r.created_at),
            })
            .collect())
    }
}
