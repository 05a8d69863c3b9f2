//! Delivery API client.
//!
//! Resolves content items, taxonomies, and content types over the CMS
//! Delivery REST API. Implements [`ContentFetcher`] for the reconciler and
//! adds the listing calls used by full sourcing.
//!
//! # Endpoints
//!
//! | Call | Request |
//! |------|---------|
//! | [`fetch_item`](ContentFetcher::fetch_item) | `GET {base}/{project}/items?system.id={id}&language={lang}&depth={n}` |
//! | [`DeliveryClient::list_items`] | `GET {base}/{project}/items?system.type={type}&language={lang}&skip&limit` |
//! | [`DeliveryClient::list_taxonomies`] | `GET {base}/{project}/taxonomies` |
//! | [`DeliveryClient::list_types`] | `GET {base}/{project}/types` |
//!
//! # Authentication
//!
//! Keys are read from environment variables named in `[delivery]`:
//! the preview key (required when `use_preview = true`) and an optional
//! secure-access key for production.
//!
//! Every request sends `X-KC-Wait-For-Loading-New-Content: true` so a fetch
//! triggered by a webhook sees the content that triggered it.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use content_sync_core::component::strip_components;
use content_sync_core::fetcher::{ContentFetcher, FetchedItem};
use content_sync_core::models::{
    ContentItemSnapshot, ContentTypeDefinition, ModularContentMap, TaxonomyGroup,
};

use crate::config::{DeliveryConfig, ProjectConfig};

const WAIT_FOR_NEW_CONTENT_HEADER: &str = "X-KC-Wait-For-Loading-New-Content";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ItemListingResponse {
    #[serde(default)]
    items: Vec<ContentItemSnapshot>,
    #[serde(default)]
    modular_content: ModularContentMap,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_page: String,
}

#[derive(Debug, Deserialize)]
struct TaxonomyListingResponse {
    #[serde(default)]
    taxonomies: Vec<TaxonomyGroup>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct TypeListingResponse {
    #[serde(default)]
    types: Vec<ContentTypeDefinition>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

/// HTTP client for one project on the Delivery API.
pub struct DeliveryClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: Option<String>,
    depth: u32,
}

impl DeliveryClient {
    /// Build a client from config, reading API keys from the environment.
    pub fn from_config(project: &ProjectConfig, delivery: &DeliveryConfig) -> Result<Self> {
        let (base_url, api_key) = if delivery.use_preview {
            let key = std::env::var(&delivery.preview_api_key_env).with_context(|| {
                format!(
                    "{} must be set when delivery.use_preview = true",
                    delivery.preview_api_key_env
                )
            })?;
            (delivery.preview_base_url.clone(), Some(key))
        } else {
            let key = std::env::var(&delivery.secure_api_key_env)
                .ok()
                .filter(|k| !k.is_empty());
            (delivery.base_url.clone(), key)
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(delivery.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self::new(client, base_url, project.id.clone(), api_key, delivery.depth))
    }

    pub fn new(
        client: reqwest::Client,
        base_url: String,
        project_id: String,
        api_key: Option<String>,
        depth: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            api_key,
            depth,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.project_id, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let mut request = self
            .client
            .get(url)
            .query(query)
            .header(WAIT_FOR_NEW_CONTENT_HEADER, "true");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Delivery API error ({}) for {}: {}", status, url, body);
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("unexpected response body from {}", url))
    }

    /// List every item of `content_type` as served for `language`, together
    /// with the merged modular content of all pages.
    pub async fn list_items(
        &self,
        content_type: &str,
        language: &str,
    ) -> Result<(Vec<ContentItemSnapshot>, ModularContentMap)> {
        let url = self.endpoint("items");
        let mut items = Vec::new();
        let mut modular = ModularContentMap::new();
        let mut skip = 0usize;

        loop {
            let page: ItemListingResponse = self
                .get_json(
                    &url,
                    &[
                        ("system.type", content_type.to_string()),
                        ("language", language.to_string()),
                        ("depth", self.depth.to_string()),
                        ("skip", skip.to_string()),
                        ("limit", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;

            let fetched = page.items.len();
            items.extend(page.items);
            modular.extend(page.modular_content);

            if !has_next_page(&page.pagination) || fetched == 0 {
                break;
            }
            skip += fetched;
        }

        debug!(content_type, language, count = items.len(), "listed items");
        Ok((items, modular))
    }

    pub async fn list_taxonomies(&self) -> Result<Vec<TaxonomyGroup>> {
        let url = self.endpoint("taxonomies");
        let mut groups = Vec::new();
        loop {
            let page: TaxonomyListingResponse = self
                .get_json(
                    &url,
                    &[
                        ("skip", groups.len().to_string()),
                        ("limit", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let fetched = page.taxonomies.len();
            groups.extend(page.taxonomies);
            if !has_next_page(&page.pagination) || fetched == 0 {
                break;
            }
        }
        Ok(groups)
    }

    pub async fn list_types(&self) -> Result<Vec<ContentTypeDefinition>> {
        let url = self.endpoint("types");
        let mut types = Vec::new();
        loop {
            let page: TypeListingResponse = self
                .get_json(
                    &url,
                    &[
                        ("skip", types.len().to_string()),
                        ("limit", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let fetched = page.types.len();
            types.extend(page.types);
            if !has_next_page(&page.pagination) || fetched == 0 {
                break;
            }
        }
        Ok(types)
    }
}

fn has_next_page(pagination: &Option<Pagination>) -> bool {
    pagination
        .as_ref()
        .map(|p| !p.next_page.is_empty())
        .unwrap_or(false)
}

#[async_trait]
impl ContentFetcher for DeliveryClient {
    async fn fetch_item(
        &self,
        item_id: &str,
        language: &str,
        include_components: bool,
    ) -> Result<FetchedItem> {
        let url = self.endpoint("items");
        let page: ItemListingResponse = self
            .get_json(
                &url,
                &[
                    ("system.id", item_id.to_string()),
                    ("language", language.to_string()),
                    ("depth", self.depth.to_string()),
                ],
            )
            .await?;

        let mut modular = page.modular_content;
        if !include_components {
            strip_components(&mut modular);
        }

        match page.items.into_iter().next() {
            Some(item) => {
                debug!(item_id, language, served = %item.system.language, "item resolved");
                Ok(FetchedItem::found(item, modular))
            }
            None => {
                debug!(item_id, language, "item does not resolve");
                Ok(FetchedItem::absent())
            }
        }
    }
}
