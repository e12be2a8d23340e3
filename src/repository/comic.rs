//! Comic document repository.
//!
//! Token sequences are JSON-encoded text columns; the overlap search and the
//! dataset statistics are pushed into SQL with `json_each` /
//! `json_array_length` so candidate selection stays in the database.

use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel_async::RunQueryDsl;

use super::context::Database;
use super::parse_datetime;
use crate::error::Result;
use crate::models::{Comic, DbStats};
use crate::schema::comics;

/// Comics whose title, alt or words sequence intersects the query tokens.
/// The single bind is the query tokens as a JSON array.
const FIND_BY_TOKENS_SQL: &str = r#"
    SELECT id, img_url, title, alt, words, fetched_at
    FROM comics
    WHERE EXISTS (SELECT 1 FROM json_each(comics.title) t, json_each(?) q WHERE t.value = q.value)
       OR EXISTS (SELECT 1 FROM json_each(comics.alt)   t, json_each(?) q WHERE t.value = q.value)
       OR EXISTS (SELECT 1 FROM json_each(comics.words) t, json_each(?) q WHERE t.value = q.value)
"#;

#[derive(Queryable, QueryableByName, Selectable, Debug, Clone)]
#[diesel(table_name = comics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct ComicRecord {
    id: i64,
    img_url: String,
    title: String,
    alt: String,
    words: String,
    fetched_at: String,
}

impl From<ComicRecord> for Comic {
    fn from(record: ComicRecord) -> Self {
        Comic {
            id: record.id,
            img_url: record.img_url,
            title: decode_tokens(&record.title),
            alt: decode_tokens(&record.alt),
            words: decode_tokens(&record.words),
            fetched_at: parse_datetime(&record.fetched_at),
        }
    }
}

fn decode_tokens(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

fn encode_tokens(tokens: &[String]) -> String {
    serde_json::to_string(tokens).unwrap_or_else(|_| "[]".to_string())
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    n: i64,
}

#[derive(Clone)]
pub struct ComicRepository {
    db: Database,
}

impl ComicRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Idempotent upsert keyed on id. Stamps `fetched_at` with the current
    /// time.
    pub async fn upsert(&self, comic: &Comic) -> Result<()> {
        let mut conn = self.db.connect().await?;
        diesel::replace_into(comics::table)
            .values((
                comics::id.eq(comic.id),
                comics::img_url.eq(&comic.img_url),
                comics::title.eq(encode_tokens(&comic.title)),
                comics::alt.eq(encode_tokens(&comic.alt)),
                comics::words.eq(encode_tokens(&comic.words)),
                comics::fetched_at.eq(Utc::now().to_rfc3339()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Ids of every stored comic, placeholders included.
    pub async fn ids(&self) -> Result<Vec<i64>> {
        let mut conn = self.db.connect().await?;
        let ids = comics::table
            .select(comics::id)
            .load::<i64>(&mut conn)
            .await?;
        Ok(ids)
    }

    /// The full document set, for index rebuilds.
    pub async fn all(&self) -> Result<Vec<Comic>> {
        let mut conn = self.db.connect().await?;
        let records = comics::table.load::<ComicRecord>(&mut conn).await?;
        Ok(records.into_iter().map(Comic::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Comic>> {
        let mut conn = self.db.connect().await?;
        let record = comics::table
            .find(id)
            .first::<ComicRecord>(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Comic::from))
    }

    /// One page in ascending id order.
    pub async fn page(&self, offset: i64, limit: i64) -> Result<Vec<Comic>> {
        let mut conn = self.db.connect().await?;
        let records = comics::table
            .order(comics::id.asc())
            .offset(offset)
            .limit(limit)
            .load::<ComicRecord>(&mut conn)
            .await?;
        Ok(records.into_iter().map(Comic::from).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let mut conn = self.db.connect().await?;
        let n = comics::table.count().get_result::<i64>(&mut conn).await?;
        Ok(n)
    }

    /// Candidates whose title, alt or words overlap any of the query tokens.
    pub async fn find_by_tokens(&self, tokens: &[String]) -> Result<Vec<Comic>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let tokens_json = encode_tokens(tokens);
        let mut conn = self.db.connect().await?;
        let records = diesel::sql_query(FIND_BY_TOKENS_SQL)
            .bind::<Text, _>(&tokens_json)
            .bind::<Text, _>(&tokens_json)
            .bind::<Text, _>(&tokens_json)
            .load::<ComicRecord>(&mut conn)
            .await?;
        Ok(records.into_iter().map(Comic::from).collect())
    }

    /// Aggregate dataset statistics. Counts the `words` column only.
    pub async fn stats(&self) -> Result<DbStats> {
        let mut conn = self.db.connect().await?;

        let total: Vec<CountRow> = diesel::sql_query(
            "SELECT COALESCE(SUM(json_array_length(words)), 0) AS n FROM comics",
        )
        .load(&mut conn)
        .await?;

        let unique: Vec<CountRow> = diesel::sql_query(
            "SELECT COUNT(DISTINCT value) AS n FROM comics, json_each(comics.words)",
        )
        .load(&mut conn)
        .await?;

        let fetched = comics::table.count().get_result::<i64>(&mut conn).await?;

        Ok(DbStats {
            words_total: total.get(0).map(|r| r.n).unwrap_or(0),
            words_unique: unique.get(0).map(|r| r.n).unwrap_or(0),
            comics_fetched: fetched,
        })
    }

    /// Remove every row. The rowid numbering restarts once the table is
    /// empty, so a subsequent ingest starts from a clean sequence.
    pub async fn drop_all(&self) -> Result<()> {
        let mut conn = self.db.connect().await?;
        diesel::delete(comics::table).execute(&mut conn).await?;
        Ok(())
    }
}
