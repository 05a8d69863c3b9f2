//! Full sourcing: build the local graph from the remote in one pass.
//!
//! The webhook path only reconciles one item at a time. `csync sync`
//! lists everything the configuration registers and materializes it the
//! same way the Upsert branch does, so a fresh database and a webhook-fed
//! one converge on identical nodes.

use anyhow::{Context, Result};
use tracing::info;

use content_sync_core::component::strip_components;
use content_sync_core::node::{build_item_node, build_taxonomy_node, build_type_node};
use content_sync_core::reconcile::{ProcessedIds, ReconcileSettings};
use content_sync_core::store::NodeStore;

use crate::delivery::DeliveryClient;

/// Counts reported by a full sourcing pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub items: usize,
    pub taxonomies: usize,
    pub types: usize,
}

/// Create (or replace) and touch every registered node.
pub async fn source_all(
    client: &DeliveryClient,
    store: &dyn NodeStore,
    settings: &ReconcileSettings,
) -> Result<SourceSummary> {
    let mut summary = SourceSummary::default();

    for language in &settings.languages {
        let mut processed = ProcessedIds::new();
        for content_type in &settings.item_types {
            let (items, mut modular) = client
                .list_items(content_type, language)
                .await
                .with_context(|| format!("failed to list {} items in {}", content_type, language))?;
            if !settings.include_components {
                strip_components(&mut modular);
            }

            for snapshot in items.iter().chain(modular.values()) {
                let node = build_item_node(snapshot, language, settings.include_raw_content)?;
                let id = node.id.clone();
                store.create(node).await?;
                processed.insert(id);
            }
        }
        for id in processed.as_slice() {
            store.touch(id).await?;
        }
        info!(language = %language, nodes = processed.len(), "sourced language");
        summary.items += processed.len();
    }

    if settings.include_taxonomies {
        for group in client.list_taxonomies().await? {
            let node = build_taxonomy_node(&group)?;
            let id = node.id.clone();
            store.create(node).await?;
            store.touch(&id).await?;
            summary.taxonomies += 1;
        }
    }

    if settings.include_types {
        for definition in client.list_types().await? {
            let node = build_type_node(&definition)?;
            let id = node.id.clone();
            store.create(node).await?;
            store.touch(&id).await?;
            summary.types += 1;
        }
    }

    Ok(summary)
}
