//! The reconciliation engine.
//!
//! One [`Reconciler::process`] call handles one webhook body end to end:
//!
//! 1. [`parse_envelope`] validates, authorizes, and classifies the body.
//! 2. Every configured language is re-resolved for the event's item id,
//!    in configuration order. Fallback means a change in one language can
//!    change what resolves for another, so the event's own language is not
//!    special.
//! 3. Per language, the Upsert branch materializes whatever resolves; the
//!    Delete branch removes the slot's node (and its components) only when
//!    nothing resolves anymore, and otherwise materializes the fallback.
//! 4. [`propagate_touches`] marks the processed nodes as still valid.
//!
//! Malformed, foreign, and unhandled events end in an [`Outcome`] rather
//! than an error. Only fetcher and store failures are returned as `Err`.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::cascade::cascade_components;
use crate::envelope::{parse_envelope, Action, ChangeEvent, Envelope};
use crate::fetcher::{ContentFetcher, FetchedItem};
use crate::models::NodeId;
use crate::node::{build_item_node, item_node_type};
use crate::store::NodeStore;
use crate::touch::propagate_touches;

/// Settings the reconciler needs, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileSettings {
    pub project_id: String,
    /// Ordered language codenames; order is processing priority.
    pub languages: Vec<String>,
    /// Registered content type codenames.
    pub item_types: Vec<String>,
    pub include_raw_content: bool,
    pub include_taxonomies: bool,
    pub include_types: bool,
    pub include_components: bool,
}

impl ReconcileSettings {
    /// Node types of all registered content types.
    pub fn item_node_types(&self) -> Vec<String> {
        self.item_types.iter().map(|t| item_node_type(t)).collect()
    }
}

/// Node ids created, updated, or deleted during one run, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ProcessedIds {
    order: Vec<NodeId>,
    seen: HashSet<NodeId>,
}

impl ProcessedIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId) {
        if self.seen.insert(id.clone()) {
            self.order.push(id);
        }
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            self.insert(id);
        }
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.order
    }

    pub fn into_vec(self) -> Vec<NodeId> {
        self.order
    }
}

/// Summary of a run that reached the fanout stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub action: Action,
    pub item_id: String,
    pub languages: Vec<String>,
    pub processed: Vec<NodeId>,
    pub touched: usize,
}

/// What happened to one webhook body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Invalid {
        reason: String,
    },
    Unsupported {
        reason: String,
    },
    Ignored {
        api_name: String,
        operation: String,
    },
    Reconciled(RunReport),
}

/// Drives a webhook body through validation, fanout, and touch propagation.
pub struct Reconciler {
    settings: ReconcileSettings,
    fetcher: Arc<dyn ContentFetcher>,
    store: Arc<dyn NodeStore>,
}

impl Reconciler {
    pub fn new(
        settings: ReconcileSettings,
        fetcher: Arc<dyn ContentFetcher>,
        store: Arc<dyn NodeStore>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            store,
        }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    /// Process one raw webhook body.
    pub async fn process(&self, body: &serde_json::Value) -> Result<Outcome> {
        match parse_envelope(body, &self.settings.project_id) {
            Envelope::Invalid(reason) => {
                info!(reason = %reason, "ignoring payload that is not a webhook envelope");
                Ok(Outcome::Invalid { reason })
            }
            Envelope::Unsupported(reason) => {
                debug!(reason = %reason, "ignoring unsupported webhook");
                Ok(Outcome::Unsupported { reason })
            }
            Envelope::Supported(event) => {
                let span = info_span!(
                    "reconcile",
                    item_id = %event.item.id,
                    operation = %event.operation,
                    api_name = %event.channel,
                );
                self.handle(event).instrument(span).await
            }
        }
    }

    async fn handle(&self, event: ChangeEvent) -> Result<Outcome> {
        if event.batch_size > 1 {
            warn!(
                batch_size = event.batch_size,
                "webhook carries more than one item; only the first is reconciled"
            );
        }

        if event.action == Action::Ignore {
            debug!(envelope = ?event.envelope, "recognized operation has no handler");
            return Ok(Outcome::Ignored {
                api_name: event.channel.api_name().to_string(),
                operation: event.operation,
            });
        }

        if !self.settings.languages.contains(&event.item.language) {
            warn!(
                language = %event.item.language,
                "event language is not configured; reconciling configured languages only"
            );
        }

        let processed = self.fanout(event.action, &event.item.id).await?;
        let touched = propagate_touches(self.store.as_ref(), &self.settings, &processed)
            .await
            .context("touch propagation failed")?;

        info!(
            action = ?event.action,
            processed = processed.len(),
            touched,
            "webhook reconciled"
        );

        Ok(Outcome::Reconciled(RunReport {
            action: event.action,
            item_id: event.item.id,
            languages: self.settings.languages.clone(),
            processed: processed.into_vec(),
            touched,
        }))
    }

    /// Reconcile every configured language of `item_id` for `action`.
    ///
    /// Languages are handled one at a time, in configuration order.
    pub async fn fanout(&self, action: Action, item_id: &str) -> Result<ProcessedIds> {
        let mut processed = ProcessedIds::new();
        for language in &self.settings.languages {
            let fetched = self
                .fetcher
                .fetch_item(item_id, language, self.settings.include_components)
                .await
                .with_context(|| {
                    format!("failed to fetch item {} for language {}", item_id, language)
                })?;

            match action {
                Action::Upsert => {
                    if fetched.item.is_none() {
                        debug!(language = %language, "nothing resolves for language; skipping");
                        continue;
                    }
                    self.materialize(fetched, language, &mut processed).await?;
                }
                Action::Delete => match fetched.item {
                    Some(_) => {
                        debug!(
                            language = %language,
                            "content still resolves via fallback; updating instead of deleting"
                        );
                        self.materialize(fetched, language, &mut processed).await?;
                    }
                    None => self.remove(item_id, language, &mut processed).await?,
                },
                Action::Ignore => {}
            }
        }
        Ok(processed)
    }

    async fn materialize(
        &self,
        fetched: FetchedItem,
        language: &str,
        processed: &mut ProcessedIds,
    ) -> Result<()> {
        let include_raw = self.settings.include_raw_content;
        let primary = fetched.item.iter();
        for snapshot in primary.chain(fetched.modular_content.values()) {
            let node = build_item_node(snapshot, language, include_raw)?;
            let id = node.id.clone();
            self.store
                .create(node)
                .await
                .with_context(|| format!("failed to create node {}", id))?;
            debug!(language = %language, codename = %snapshot.system.codename, node = %id, "upserted node");
            processed.insert(id);
        }
        Ok(())
    }

    async fn remove(
        &self,
        item_id: &str,
        language: &str,
        processed: &mut ProcessedIds,
    ) -> Result<()> {
        let id = self.store.node_id_for(item_id, language);
        let node = match self.store.get_by_id(&id).await? {
            Some(node) => node,
            None => {
                debug!(language = %language, node = %id, "no local node to delete");
                return Ok(());
            }
        };

        let components =
            cascade_components(self.store.as_ref(), &node, &self.settings.item_node_types())
                .await
                .with_context(|| format!("component cascade failed for node {}", id))?;
        processed.extend(components);

        self.store
            .delete(&node)
            .await
            .with_context(|| format!("failed to delete node {}", id))?;
        debug!(language = %language, node = %id, "deleted node");
        processed.insert(id);
        Ok(())
    }
}
