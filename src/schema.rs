//! Diesel table definitions.
//!
//! Token sequences (`title`, `alt`, `words`) are JSON-encoded text columns;
//! timestamps are RFC 3339 text.

diesel::table! {
    comics (id) {
        id -> BigInt,
        img_url -> Text,
        title -> Text,
        alt -> Text,
        words -> Text,
        fetched_at -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> BigInt,
        email -> Nullable<Text>,
        password_hash -> Nullable<Text>,
        tg_id -> Nullable<BigInt>,
        username -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    favorites (user_id, comic_id) {
        user_id -> BigInt,
        comic_id -> BigInt,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(comics, users, favorites);
