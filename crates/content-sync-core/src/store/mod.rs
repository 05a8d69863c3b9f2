//! Node store abstraction for Content Sync.
//!
//! The [`NodeStore`] trait is the only view the reconciler has of the local
//! graph, enabling pluggable backends (SQLite, in-memory).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{LocalNode, NodeId};

/// Abstract storage backend for local graph nodes.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_by_id`](NodeStore::get_by_id) | Look up one node |
/// | [`get_all_by_type`](NodeStore::get_all_by_type) | All nodes of one node type |
/// | [`get_all`](NodeStore::get_all) | Every stored node |
/// | [`create`](NodeStore::create) | Create or replace a node by id |
/// | [`delete`](NodeStore::delete) | Remove a node |
/// | [`touch`](NodeStore::touch) | Mark a node as still valid for this pass |
/// | [`node_id_for`](NodeStore::node_id_for) | Deterministic item node id |
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn get_by_id(&self, id: &NodeId) -> Result<Option<LocalNode>>;

    async fn get_all_by_type(&self, node_type: &str) -> Result<Vec<LocalNode>>;

    async fn get_all(&self) -> Result<Vec<LocalNode>>;

    /// Create a node, replacing any node with the same id.
    async fn create(&self, node: LocalNode) -> Result<()>;

    /// Delete a node. Deleting a node that no longer exists is not an error.
    async fn delete(&self, node: &LocalNode) -> Result<()>;

    /// Reset the staleness marker of a node. Idempotent; unknown ids are ignored.
    async fn touch(&self, id: &NodeId) -> Result<()>;

    /// Id of the node holding `item_id` in the requested-language slot `language`.
    fn node_id_for(&self, item_id: &str, language: &str) -> NodeId {
        NodeId::for_item(item_id, language)
    }
}
