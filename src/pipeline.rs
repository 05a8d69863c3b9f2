//! Wiring between configuration, collaborators, and the reconciler, plus
//! the CLI entry points that drive them.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use content_sync_core::reconcile::{Outcome, Reconciler};

use crate::config::Config;
use crate::db;
use crate::delivery::DeliveryClient;
use crate::source::source_all;
use crate::sqlite_store::SqliteNodeStore;

/// Build a reconciler backed by the SQLite store and the Delivery API.
pub async fn build_reconciler(config: &Config) -> Result<Reconciler> {
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteNodeStore::new(pool));
    let client = DeliveryClient::from_config(&config.project, &config.delivery)?;
    Ok(Reconciler::new(
        config.reconcile_settings(),
        Arc::new(client),
        store,
    ))
}

/// Process one webhook payload read from `path` and print the outcome.
pub async fn run_replay(config: &Config, path: &Path) -> Result<Outcome> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read webhook payload: {}", path.display()))?;
    let body: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Webhook payload is not valid JSON: {}", path.display()))?;

    let reconciler = build_reconciler(config).await?;
    let outcome = reconciler.process(&body).await?;

    match &outcome {
        Outcome::Invalid { reason } => println!("ignored (not a webhook): {}", reason),
        Outcome::Unsupported { reason } => println!("ignored (unsupported): {}", reason),
        Outcome::Ignored {
            api_name,
            operation,
        } => println!("ignored (no handler for {} {})", api_name, operation),
        Outcome::Reconciled(report) => {
            println!("reconciled {} ({:?})", report.item_id, report.action);
            println!("  languages: {}", report.languages.join(", "));
            println!("  nodes processed: {}", report.processed.len());
            for id in &report.processed {
                println!("    {}", id);
            }
            println!("  nodes touched: {}", report.touched);
        }
    }

    Ok(outcome)
}

/// Full sourcing into the configured SQLite database.
pub async fn run_sync(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteNodeStore::new(pool.clone());
    let client = DeliveryClient::from_config(&config.project, &config.delivery)?;
    let settings = config.reconcile_settings();

    let summary = source_all(&client, &store, &settings).await?;

    println!("sync {}", config.project.id);
    println!("  languages: {}", settings.languages.join(", "));
    println!("  item nodes: {}", summary.items);
    if settings.include_taxonomies {
        println!("  taxonomy nodes: {}", summary.taxonomies);
    }
    if settings.include_types {
        println!("  type nodes: {}", summary.types);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}
