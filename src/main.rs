//! # Content Sync CLI (`csync`)
//!
//! ## Usage
//!
//! ```bash
//! csync --config ./config/csync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `csync init` | Create the SQLite database and run schema migrations |
//! | `csync sync` | Source every registered node from the Delivery API |
//! | `csync serve` | Start the webhook server |
//! | `csync replay <file>` | Process one webhook payload from a JSON file |
//! | `csync nodes` | List stored nodes and their touched state |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use content_sync::{config, migrate, nodes, pipeline, server};

/// Content Sync CLI: keeps a local content graph in sync with a headless CMS.
#[derive(Parser)]
#[command(
    name = "csync",
    about = "Content Sync: webhook-driven reconciliation of a local content graph",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/csync.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Source every registered item (and taxonomies/types when configured)
    /// from the Delivery API into the local database.
    Sync,

    /// Start the webhook server.
    Serve,

    /// Process one webhook payload read from a JSON file.
    Replay {
        /// Path to the webhook body.
        path: PathBuf,
    },

    /// List stored nodes.
    Nodes {
        /// Only list nodes of this node type (e.g. `content_item_article`).
        #[arg(long = "type")]
        node_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync => {
            migrate::run_migrations(&cfg).await?;
            pipeline::run_sync(&cfg).await?;
        }
        Commands::Serve => {
            migrate::run_migrations(&cfg).await?;
            server::run_server(&cfg).await?;
        }
        Commands::Replay { path } => {
            migrate::run_migrations(&cfg).await?;
            pipeline::run_replay(&cfg, &path).await?;
        }
        Commands::Nodes { node_type } => {
            nodes::run_nodes(&cfg, node_type.as_deref()).await?;
        }
    }

    Ok(())
}
