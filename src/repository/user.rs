//! User account repository.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::context::Database;
use super::parse_datetime;
use crate::error::{Error, Result};
use crate::models::{TelegramProfile, User};
use crate::schema::users;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct UserRecord {
    id: i64,
    email: Option<String>,
    #[allow(dead_code)]
    password_hash: Option<String>,
    tg_id: Option<i64>,
    #[allow(dead_code)]
    username: Option<String>,
    #[allow(dead_code)]
    first_name: Option<String>,
    #[allow(dead_code)]
    last_name: Option<String>,
    created_at: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            email: record.email,
            tg_id: record.tg_id,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new email/password account. A duplicate email surfaces as
    /// `AlreadyExists`.
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<User> {
        let mut conn = self.db.connect().await?;

        diesel::insert_into(users::table)
            .values((
                users::email.eq(email),
                users::password_hash.eq(password_hash),
                users::created_at.eq(Utc::now().to_rfc3339()),
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

        let record = users::table
            .filter(users::email.eq(email))
            .first::<UserRecord>(&mut conn)
            .await?;
        Ok(User::from(record))
    }

    /// Account and password hash by email, if registered.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let mut conn = self.db.connect().await?;
        let record = users::table
            .filter(users::email.eq(email))
            .first::<UserRecord>(&mut conn)
            .await
            .optional()?;
        Ok(record.and_then(|r| {
            let hash = r.password_hash.clone()?;
            Some((User::from(r), hash))
        }))
    }

    /// Insert-or-refresh a telegram account keyed on the unique tg_id.
    pub async fn upsert_telegram(&self, profile: &TelegramProfile) -> Result<User> {
        let mut conn = self.db.connect().await?;

        let existing = users::table
            .filter(users::tg_id.eq(profile.tg_id))
            .first::<UserRecord>(&mut conn)
            .await
            .optional()?;

        match existing {
            Some(record) => {
                diesel::update(users::table.find(record.id))
                    .set((
                        users::username.eq(&profile.username),
                        users::first_name.eq(&profile.first_name),
                        users::last_name.eq(&profile.last_name),
                    ))
                    .execute(&mut conn)
                    .await?;
                Ok(User::from(record))
            }
            None => {
                diesel::insert_into(users::table)
                    .values((
                        users::tg_id.eq(profile.tg_id),
                        users::username.eq(&profile.username),
                        users::first_name.eq(&profile.first_name),
                        users::last_name.eq(&profile.last_name),
                        users::created_at.eq(Utc::now().to_rfc3339()),
                    ))
                    .execute(&mut conn)
                    .await?;
                let record = users::table
                    .filter(users::tg_id.eq(profile.tg_id))
                    .first::<UserRecord>(&mut conn)
                    .await?;
                Ok(User::from(record))
            }
        }
    }
}
