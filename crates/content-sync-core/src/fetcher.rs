//! Remote content fetcher abstraction.
//!
//! The reconciler never talks to the CMS directly. It asks a
//! [`ContentFetcher`] to resolve one item in one requested language, with
//! the remote's language fallback already applied.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ContentItemSnapshot, ModularContentMap};

/// Result of resolving one item in one requested language.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedItem {
    /// `None` when nothing resolves for the requested language. This is a
    /// valid state, not an error.
    pub item: Option<ContentItemSnapshot>,
    /// Linked items and components referenced by `item`.
    pub modular_content: ModularContentMap,
}

impl FetchedItem {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn found(item: ContentItemSnapshot, modular_content: ModularContentMap) -> Self {
        Self {
            item: Some(item),
            modular_content,
        }
    }
}

/// Resolves content items against the remote source of truth.
///
/// Implementations return `Ok` with an absent item when the item does not
/// resolve, and `Err` only for I/O or protocol failures.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch `item_id` as served for `language`.
    ///
    /// When `include_components` is `false`, component entries are left out
    /// of the modular content map.
    async fn fetch_item(
        &self,
        item_id: &str,
        language: &str,
        include_components: bool,
    ) -> Result<FetchedItem>;
}
