//! In-memory [`NodeStore`] implementation for testing and embedding.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety. Nodes are
//! returned in id order so callers see a stable sequence.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{LocalNode, NodeId};

use super::NodeStore;

struct StoredNode {
    node: LocalNode,
    touched_at: Option<DateTime<Utc>>,
}

/// In-memory node store.
pub struct InMemoryNodeStore {
    nodes: RwLock<HashMap<NodeId, StoredNode>>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Ids of nodes touched since they were last created, in id order.
    pub fn touched_ids(&self) -> Vec<NodeId> {
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<NodeId> = nodes
            .iter()
            .filter(|(_, s)| s.touched_at.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.read().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory node store lock poisoned")
}

fn sorted(mut nodes: Vec<LocalNode>) -> Vec<LocalNode> {
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    nodes
}

#[async_trait]
impl NodeStore for InMemoryNodeStore {
    async fn get_by_id(&self, id: &NodeId) -> Result<Option<LocalNode>> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        Ok(nodes.get(id).map(|s| s.node.clone()))
    }

    async fn get_all_by_type(&self, node_type: &str) -> Result<Vec<LocalNode>> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        Ok(sorted(
            nodes
                .values()
                .filter(|s| s.node.node_type == node_type)
                .map(|s| s.node.clone())
                .collect(),
        ))
    }

    async fn get_all(&self) -> Result<Vec<LocalNode>> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        Ok(sorted(nodes.values().map(|s| s.node.clone()).collect()))
    }

    async fn create(&self, node: LocalNode) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        nodes.insert(
            node.id.clone(),
            StoredNode {
                node,
                touched_at: None,
            },
        );
        Ok(())
    }

    async fn delete(&self, node: &LocalNode) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        nodes.remove(&node.id);
        Ok(())
    }

    async fn touch(&self, id: &NodeId) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        if let Some(stored) = nodes.get_mut(id) {
            stored.touched_at = Some(Utc::now());
        }
        Ok(())
    }
}
