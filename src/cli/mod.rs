//! Command-line interface.
//!
//! `serve` runs the HTTP gateway; the admin subcommands (`update`, `drop`,
//! `stats`, `status`) operate on the configured database directly.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::catalog::{CatalogClient, XkcdClient};
use crate::config::{self, Settings};
use crate::ingest::IngestService;
use crate::repository::DbContext;
use crate::server;
use crate::shutdown;
use crate::words::SnowballNormalizer;

#[derive(Parser)]
#[command(name = "comichub")]
#[command(about = "xkcd catalog ingest and ranked keyword search service")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ./comichub.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database schema
    Init,

    /// Run the HTTP gateway
    Serve {
        /// Listen host override
        #[arg(long)]
        host: Option<String>,
        /// Listen port override
        #[arg(long)]
        port: Option<u16>,
    },

    /// Fetch every missing catalog entry into the database
    Update,

    /// Drop all stored comics
    Drop,

    /// Show dataset statistics
    Stats,

    /// Show the ingest engine status
    Status,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing::debug!("debug messages are enabled");
    }
    let mut settings =
        config::load_settings(cli.config.as_deref(), cli.data_dir.as_deref()).await;

    match cli.command {
        Commands::Init => {
            settings.ensure_directories()?;
            let ctx = DbContext::from_url(&settings.database_url());
            ctx.init_schema().await?;
            println!("initialized {}", settings.database_path().display());
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.http_host = host;
            }
            if let Some(port) = port {
                settings.http_port = port;
            }
            server::serve(&settings).await?;
        }
        Commands::Update => {
            let ingest = build_ingest(&settings).await?;

            // Ctrl-C cancels the run; the next update resumes from the gap.
            let (handle, token) = shutdown::channel();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                handle.cancel();
            });

            ingest.update(token).await?;
            let stats = ingest.stats().await?;
            println!(
                "fetched {} of {} comics",
                stats.comics_fetched, stats.comics_total
            );
        }
        Commands::Drop => {
            let ingest = build_ingest(&settings).await?;
            ingest.drop_all().await?;
            println!("comics dropped");
        }
        Commands::Stats => {
            let ingest = build_ingest(&settings).await?;
            let stats = ingest.stats().await?;
            println!("words_total:    {}", stats.words_total);
            println!("words_unique:   {}", stats.words_unique);
            println!("comics_fetched: {}", stats.comics_fetched);
            println!("comics_total:   {}", stats.comics_total);
        }
        Commands::Status => {
            let ingest = build_ingest(&settings).await?;
            println!("{}", ingest.status().as_str());
        }
    }

    Ok(())
}

async fn build_ingest(settings: &Settings) -> anyhow::Result<IngestService> {
    settings.ensure_directories()?;
    let ctx = DbContext::from_url(&settings.database_url());
    ctx.init_schema().await?;

    let catalog: Arc<dyn CatalogClient> =
        Arc::new(XkcdClient::new(&settings.xkcd_url, settings.xkcd_timeout())?);
    let ingest = IngestService::new(
        ctx.comics(),
        catalog,
        Arc::new(SnowballNormalizer),
        settings.concurrency,
    )?;
    Ok(ingest)
}
