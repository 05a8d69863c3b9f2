//! Local graph overview for `csync nodes`.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteNodeStore;

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Print every stored node, optionally filtered by node type.
pub async fn run_nodes(config: &Config, node_type: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteNodeStore::new(pool.clone());
    let records = store.records(node_type).await?;

    println!(
        "{:<38} {:<28} {:<28} {:<10} TOUCHED",
        "ID", "TYPE", "CODENAME", "SLOT"
    );
    for record in &records {
        let node = &record.node;
        println!(
            "{:<38} {:<28} {:<28} {:<10} {}",
            node.id,
            node.node_type,
            node.codename(),
            node.preferred_language().unwrap_or("-"),
            record
                .touched_at
                .map(format_ts)
                .unwrap_or_else(|| "stale".to_string())
        );
    }
    println!();
    println!("{} nodes", records.len());

    pool.close().await;
    Ok(())
}
