//! Touch propagation.
//!
//! After a run, nodes that the run created, updated, or deleted are marked
//! as still valid so a downstream garbage-collection sweep keeps them.
//! Taxonomy and type nodes are not versioned per change event and are
//! touched wholesale when their inclusion is configured.

use anyhow::Result;
use tracing::debug;

use crate::node::{TAXONOMY_NODE_TYPE, TYPE_NODE_TYPE};
use crate::reconcile::{ProcessedIds, ReconcileSettings};
use crate::store::NodeStore;

/// Touch every processed item node plus, when configured, every taxonomy
/// and type node. Returns the number of nodes touched.
pub async fn propagate_touches(
    store: &dyn NodeStore,
    settings: &ReconcileSettings,
    processed: &ProcessedIds,
) -> Result<usize> {
    let mut touched = 0usize;

    for node_type in settings.item_node_types() {
        for node in store.get_all_by_type(&node_type).await? {
            if processed.contains(&node.id) {
                store.touch(&node.id).await?;
                touched += 1;
            }
        }
    }

    if settings.include_taxonomies {
        touched += touch_all(store, TAXONOMY_NODE_TYPE).await?;
    }
    if settings.include_types {
        touched += touch_all(store, TYPE_NODE_TYPE).await?;
    }

    debug!(touched, "touch propagation complete");
    Ok(touched)
}

async fn touch_all(store: &dyn NodeStore, node_type: &str) -> Result<usize> {
    let nodes = store.get_all_by_type(node_type).await?;
    for node in &nodes {
        store.touch(&node.id).await?;
    }
    Ok(nodes.len())
}
