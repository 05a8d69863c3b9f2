//! SQLite-backed [`NodeStore`] implementation.
//!
//! Every node is one row in the `nodes` table. The node payload is stored
//! as JSON in `body_json`; `node_type`, `codename`, and
//! `preferred_language` are broken out into columns for lookups.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use content_sync_core::models::{LocalNode, NodeId, NodeKind};
use content_sync_core::store::NodeStore;

/// A stored node together with its staleness marker.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub node: LocalNode,
    pub created_at: i64,
    pub touched_at: Option<i64>,
}

/// SQLite implementation of the [`NodeStore`] trait.
pub struct SqliteNodeStore {
    pool: SqlitePool,
}

impl SqliteNodeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// All nodes with their timestamps, optionally filtered by node type.
    pub async fn records(&self, node_type: Option<&str>) -> Result<Vec<NodeRecord>> {
        let rows = match node_type {
            Some(t) => {
                sqlx::query(
                    "SELECT id, node_type, body_json, content_digest, created_at, touched_at \
                     FROM nodes WHERE node_type = ? ORDER BY node_type, codename, preferred_language",
                )
                .bind(t)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, node_type, body_json, content_digest, created_at, touched_at \
                     FROM nodes ORDER BY node_type, codename, preferred_language",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter()
            .map(|row| {
                Ok(NodeRecord {
                    node: node_from_row(row)?,
                    created_at: row.get("created_at"),
                    touched_at: row.get("touched_at"),
                })
            })
            .collect()
    }
}

fn node_from_row(row: &SqliteRow) -> Result<LocalNode> {
    let id: String = row.get("id");
    let body: String = row.get("body_json");
    let kind: NodeKind = serde_json::from_str(&body)
        .with_context(|| format!("corrupt node body for {}", id))?;
    Ok(LocalNode {
        id: NodeId::from_raw(id),
        node_type: row.get("node_type"),
        kind,
        content_digest: row.get("content_digest"),
    })
}

#[async_trait]
impl NodeStore for SqliteNodeStore {
    async fn get_by_id(&self, id: &NodeId) -> Result<Option<LocalNode>> {
        let row = sqlx::query(
            "SELECT id, node_type, body_json, content_digest FROM nodes WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(node_from_row).transpose()
    }

    async fn get_all_by_type(&self, node_type: &str) -> Result<Vec<LocalNode>> {
        let rows = sqlx::query(
            "SELECT id, node_type, body_json, content_digest FROM nodes WHERE node_type = ? ORDER BY id",
        )
        .bind(node_type)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(node_from_row).collect()
    }

    async fn get_all(&self) -> Result<Vec<LocalNode>> {
        let rows =
            sqlx::query("SELECT id, node_type, body_json, content_digest FROM nodes ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(node_from_row).collect()
    }

    async fn create(&self, node: LocalNode) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let body = serde_json::to_string(&node.kind)?;

        sqlx::query(
            r#"
            INSERT INTO nodes (id, node_type, codename, preferred_language, body_json,
                               content_digest, created_at, touched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, NULL)
            ON CONFLICT(id) DO UPDATE SET
                node_type = excluded.node_type,
                codename = excluded.codename,
                preferred_language = excluded.preferred_language,
                body_json = excluded.body_json,
                content_digest = excluded.content_digest,
                created_at = excluded.created_at,
                touched_at = NULL
            "#,
        )
        .bind(node.id.as_str())
        .bind(&node.node_type)
        .bind(node.codename())
        .bind(node.preferred_language())
        .bind(&body)
        .bind(&node.content_digest)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, node: &LocalNode) -> Result<()> {
        sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(node.id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch(&self, id: &NodeId) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE nodes SET touched_at = ? WHERE id = ?")
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
