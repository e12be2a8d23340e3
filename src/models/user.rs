//! User and favorites models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. Either `email` (web registration) or `tg_id`
/// (telegram bot login) is set; both are unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub tg_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Telegram identity upserted on bot login.
#[derive(Debug, Clone, Default)]
pub struct TelegramProfile {
    pub tg_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// One bookmarked comic for a user.
#[derive(Debug, Clone, Serialize)]
pub struct Favorite {
    pub comic_id: i64,
    pub created_at: DateTime<Utc>,
}
