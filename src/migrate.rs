use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // One row per local graph node
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id TEXT PRIMARY KEY,
            node_type TEXT NOT NULL,
            codename TEXT NOT NULL,
            preferred_language TEXT,
            body_json TEXT NOT NULL,
            content_digest TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            touched_at INTEGER
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_node_type ON nodes(node_type)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_nodes_codename_language ON nodes(codename, preferred_language)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
