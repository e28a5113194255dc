//! # Learnova CLI
//!
//! | Command | Description |
//! |---------|-------------|
//! | `learnova init` | Create the SQLite database and run schema migrations |
//! | `learnova serve` | Start the HTTP API server |
//!
//! Both commands accept a `--config` flag pointing to a TOML configuration
//! file; when the file is absent, built-in defaults are used. The `PORT`
//! environment variable (default 5000) overrides the configured listen port.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use learnova::{config, db, gateway, migrate, server, upload::UploadStore};

/// Learnova AI — an HTTP service for syllabus-grounded AI tutoring.
#[derive(Parser)]
#[command(
    name = "learnova",
    about = "Learnova AI — an HTTP service for syllabus-grounded AI tutoring",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means built-in defaults.
    #[arg(long, global = true, default_value = "./config/learnova.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the syllabus material table.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Start the HTTP API server.
    ///
    /// Binds to `[server].bind` (the `PORT` environment variable overrides
    /// the port), creates the upload directories, and serves the API until
    /// the process is terminated.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            if let Ok(port) = std::env::var("PORT") {
                let port: u16 = port.parse().map_err(|_| {
                    anyhow::anyhow!("PORT must be a number, got '{}'", port)
                })?;
                let host = cfg
                    .server
                    .bind
                    .rsplit_once(':')
                    .map(|(host, _)| host.to_string())
                    .unwrap_or_else(|| "0.0.0.0".to_string());
                cfg.server.bind = format!("{}:{}", host, port);
            }

            UploadStore::ensure_dirs(&cfg.storage.upload_dir, &cfg.storage.temp_dir)?;

            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;

            let gateway = gateway::create_gateway(&cfg, pool)?;
            server::run_server(Arc::new(cfg), gateway).await?;
        }
    }

    Ok(())
}
