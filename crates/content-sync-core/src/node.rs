//! Materialization of remote snapshots into [`LocalNode`]s.
//!
//! Node types follow a fixed naming scheme:
//!
//! | Entity | Node type |
//! |--------|-----------|
//! | Content item of type `article` | `content_item_article` |
//! | Taxonomy group | `content_taxonomy` |
//! | Content type definition | `content_type` |

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::models::{
    ContentItemSnapshot, ContentTypeDefinition, ItemNode, LocalNode, NodeId, NodeKind,
    TaxonomyGroup,
};

pub const ITEM_NODE_PREFIX: &str = "content_item_";
pub const TAXONOMY_NODE_TYPE: &str = "content_taxonomy";
pub const TYPE_NODE_TYPE: &str = "content_type";

/// Node type for items of the content type `content_type`.
pub fn item_node_type(content_type: &str) -> String {
    format!("{}{}", ITEM_NODE_PREFIX, content_type)
}

/// Build the node for `snapshot` in the requested-language slot `preferred_language`.
///
/// The id comes from the snapshot's item id and the *requested* language,
/// so a fallback variant served in another language still lands in the
/// requested slot.
pub fn build_item_node(
    snapshot: &ContentItemSnapshot,
    preferred_language: &str,
    include_raw_content: bool,
) -> Result<LocalNode> {
    let raw = if include_raw_content {
        Some(serde_json::to_value(snapshot).context("failed to serialize raw snapshot")?)
    } else {
        None
    };

    let kind = NodeKind::Item(ItemNode {
        system: snapshot.system.clone(),
        elements: snapshot.elements.clone(),
        preferred_language: preferred_language.to_string(),
        raw,
    });

    finish(
        NodeId::for_item(&snapshot.system.id, preferred_language),
        item_node_type(&snapshot.system.content_type),
        kind,
    )
}

pub fn build_taxonomy_node(group: &TaxonomyGroup) -> Result<LocalNode> {
    finish(
        NodeId::for_taxonomy(&group.system.codename),
        TAXONOMY_NODE_TYPE.to_string(),
        NodeKind::Taxonomy(group.clone()),
    )
}

pub fn build_type_node(definition: &ContentTypeDefinition) -> Result<LocalNode> {
    finish(
        NodeId::for_type(&definition.system.codename),
        TYPE_NODE_TYPE.to_string(),
        NodeKind::Type(definition.clone()),
    )
}

fn finish(id: NodeId, node_type: String, kind: NodeKind) -> Result<LocalNode> {
    let serialized = serde_json::to_vec(&kind).context("failed to serialize node content")?;
    let mut hasher = Sha256::new();
    hasher.update(&serialized);
    let content_digest = format!("{:x}", hasher.finalize());

    Ok(LocalNode {
        id,
        node_type,
        kind,
        content_digest,
    })
}
