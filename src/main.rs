//! comichub - xkcd catalog ingest and ranked keyword search service.
//!
//! Ingests the remote comic catalog, normalizes its text into stemmed
//! tokens, stores documents in SQLite and serves ranked keyword search,
//! favorites and admin operations over HTTP.

mod auth;
mod broker;
mod catalog;
mod cli;
mod config;
mod error;
mod ingest;
mod models;
mod repository;
mod schema;
mod search;
mod server;
mod shutdown;
mod words;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = if cli::is_verbose() {
        "comichub=debug"
    } else {
        "comichub=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run().await
}
