//! Core data models used throughout Content Sync.
//!
//! Two families of types live here: the remote shapes returned by the
//! Delivery API ([`ContentItemSnapshot`], [`TaxonomyGroup`],
//! [`ContentTypeDefinition`]) and the local graph representation
//! ([`LocalNode`]) persisted by a [`NodeStore`](crate::store::NodeStore).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Element type tag for rich-text elements.
pub const RICH_TEXT_ELEMENT: &str = "rich_text";

/// Namespace for deterministic node ids.
const NODE_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_58a2_93d4_4b0e_8f27_c4e1_0b9a_d315);

/// Identity of a node in the local graph.
///
/// Always derived from remote identity, never random: the same
/// `(item id, requested language)` pair yields the same id in every
/// process, which is what makes recreate-by-id idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Id of the node holding `item_id` in the `language` slot.
    ///
    /// The language is the *requested* language, not the language the
    /// remote actually served after fallback.
    pub fn for_item(item_id: &str, language: &str) -> Self {
        Self::derive(&format!("item:{}:{}", item_id, language))
    }

    /// Id of the node holding the taxonomy group `codename`.
    pub fn for_taxonomy(codename: &str) -> Self {
        Self::derive(&format!("taxonomy:{}", codename))
    }

    /// Id of the node holding the content type definition `codename`.
    pub fn for_type(codename: &str) -> Self {
        Self::derive(&format!("type:{}", codename))
    }

    /// Wrap an id read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn derive(name: &str) -> Self {
        Self(Uuid::new_v5(&NODE_NAMESPACE, name.as_bytes()).to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Remote shapes
// ═══════════════════════════════════════════════════════════════════════

/// System attributes of a content item variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSystem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub codename: String,
    /// Language the remote actually served (may differ from the requested one).
    pub language: String,
    /// Content type codename.
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub workflow_step: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// A single element of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
    /// Codenames of linked items and components referenced from rich text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modular_content: Vec<String>,
}

impl Element {
    pub fn is_rich_text(&self) -> bool {
        self.element_type == RICH_TEXT_ELEMENT
    }
}

/// One content item variant as returned by the remote fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItemSnapshot {
    pub system: ItemSystem,
    #[serde(default)]
    pub elements: BTreeMap<String, Element>,
}

/// Linked items and components returned alongside a primary fetch, keyed by codename.
pub type ModularContentMap = BTreeMap<String, ContentItemSnapshot>;

/// System attributes shared by taxonomy groups and content types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSystem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub codename: String,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// A taxonomy group with its (nested) terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyGroup {
    pub system: DefinitionSystem,
    #[serde(default)]
    pub terms: serde_json::Value,
}

/// A content type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeDefinition {
    pub system: DefinitionSystem,
    #[serde(default)]
    pub elements: serde_json::Value,
}

// ═══════════════════════════════════════════════════════════════════════
// Local graph
// ═══════════════════════════════════════════════════════════════════════

/// Item payload of a [`LocalNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemNode {
    pub system: ItemSystem,
    pub elements: BTreeMap<String, Element>,
    /// Requested-language slot this node occupies.
    pub preferred_language: String,
    /// Full snapshot JSON, kept only when raw content inclusion is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

/// What a [`LocalNode`] holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Item(ItemNode),
    Taxonomy(TaxonomyGroup),
    Type(ContentTypeDefinition),
}

/// Persisted form of a remote entity in the local graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalNode {
    pub id: NodeId,
    pub node_type: String,
    pub kind: NodeKind,
    /// Hex SHA-256 of the serialized `kind`.
    pub content_digest: String,
}

impl LocalNode {
    pub fn as_item(&self) -> Option<&ItemNode> {
        match &self.kind {
            NodeKind::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn codename(&self) -> &str {
        match &self.kind {
            NodeKind::Item(item) => &item.system.codename,
            NodeKind::Taxonomy(group) => &group.system.codename,
            NodeKind::Type(def) => &def.system.codename,
        }
    }

    /// Requested-language slot for item nodes; `None` for definitions.
    pub fn preferred_language(&self) -> Option<&str> {
        self.as_item().map(|item| item.preferred_language.as_str())
    }
}
