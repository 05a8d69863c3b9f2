//! Component cascade on removal.
//!
//! When an item node goes away, components referenced from its rich text
//! would otherwise linger with no parent. Only nodes that sit in the same
//! requested-language slot and carry the component marker are removed;
//! ordinary linked items are shared and stay.

use std::collections::BTreeSet;

use anyhow::Result;
use tracing::debug;

use crate::component::is_component_id;
use crate::models::{LocalNode, NodeId};
use crate::store::NodeStore;

/// Codenames referenced from all rich-text elements of `node`.
pub fn rich_text_references(node: &LocalNode) -> BTreeSet<String> {
    node.as_item()
        .map(|item| {
            item.elements
                .values()
                .filter(|e| e.is_rich_text())
                .flat_map(|e| e.modular_content.iter().cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// Delete the components owned by `removed`, returning their ids.
///
/// `item_node_types` are the registered item node types to search. The
/// removed node itself is left to the caller.
pub async fn cascade_components(
    store: &dyn NodeStore,
    removed: &LocalNode,
    item_node_types: &[String],
) -> Result<Vec<NodeId>> {
    let slot = match removed.preferred_language() {
        Some(slot) => slot,
        None => return Ok(Vec::new()),
    };

    let references = rich_text_references(removed);
    if references.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for node_type in item_node_types {
        candidates.extend(store.get_all_by_type(node_type).await?);
    }

    let mut deleted = Vec::new();
    for codename in &references {
        let matches = candidates
            .iter()
            .filter(|c| c.codename() == codename && c.preferred_language() == Some(slot));
        for candidate in matches {
            let item_id = match candidate.as_item() {
                Some(item) => &item.system.id,
                None => continue,
            };
            if !is_component_id(item_id) {
                debug!(codename = %codename, "keeping linked item referenced by removed node");
                continue;
            }
            store.delete(candidate).await?;
            debug!(codename = %codename, node = %candidate.id, "deleted orphaned component");
            deleted.push(candidate.id.clone());
        }
    }

    Ok(deleted)
}
