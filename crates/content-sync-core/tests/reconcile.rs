//! End-to-end tests for the reconciliation engine, driven through
//! [`Reconciler::process`] with an in-memory store and a scripted fetcher.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use content_sync_core::envelope::Action;
use content_sync_core::fetcher::{ContentFetcher, FetchedItem};
use content_sync_core::models::{ContentItemSnapshot, Element, ItemSystem, LocalNode, NodeId};
use content_sync_core::node::{build_item_node, build_taxonomy_node, build_type_node};
use content_sync_core::reconcile::{Outcome, ReconcileSettings, Reconciler};
use content_sync_core::store::memory::InMemoryNodeStore;
use content_sync_core::store::NodeStore;

const PROJECT: &str = "11a3492b-cd32-0054-51d2-8234ec4244a6";
const ITEM: &str = "f4b3fc05-e988-4dae-9ac1-a94aba566474";
const COMPONENT: &str = "e3a5bc01-a4a6-0101-8a8d-1eb4e0b1a4a7";
const LINKED: &str = "1b5f2c3d-0000-4e4e-9f9f-000000000001";

// ─── Scripted fetcher ───────────────────────────────────────────────

/// Fetcher that serves whatever the test put in for `(item id, language)`.
#[derive(Default)]
struct ScriptedFetcher {
    responses: RwLock<HashMap<(String, String), FetchedItem>>,
    calls: RwLock<Vec<(String, String)>>,
}

impl ScriptedFetcher {
    fn serve(&self, item_id: &str, language: &str, fetched: FetchedItem) {
        self.responses
            .write()
            .unwrap()
            .insert((item_id.to_string(), language.to_string()), fetched);
    }

    fn withdraw(&self, item_id: &str, language: &str) {
        self.responses
            .write()
            .unwrap()
            .remove(&(item_id.to_string(), language.to_string()));
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch_item(
        &self,
        item_id: &str,
        language: &str,
        _include_components: bool,
    ) -> Result<FetchedItem> {
        self.calls
            .write()
            .unwrap()
            .push((item_id.to_string(), language.to_string()));
        Ok(self
            .responses
            .read()
            .unwrap()
            .get(&(item_id.to_string(), language.to_string()))
            .cloned()
            .unwrap_or_else(FetchedItem::absent))
    }
}

/// Fetcher whose remote is down.
struct FailingFetcher;

#[async_trait]
impl ContentFetcher for FailingFetcher {
    async fn fetch_item(&self, _: &str, _: &str, _: bool) -> Result<FetchedItem> {
        bail!("connection refused")
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn settings(languages: &[&str]) -> ReconcileSettings {
    ReconcileSettings {
        project_id: PROJECT.to_string(),
        languages: languages.iter().map(|l| l.to_string()).collect(),
        item_types: vec!["article".to_string(), "tweet".to_string()],
        include_raw_content: false,
        include_taxonomies: false,
        include_types: false,
        include_components: true,
    }
}

fn snapshot(id: &str, codename: &str, content_type: &str, language: &str, refs: &[&str]) -> ContentItemSnapshot {
    let mut elements = BTreeMap::new();
    elements.insert(
        "title".to_string(),
        Element {
            element_type: "text".to_string(),
            name: "Title".to_string(),
            value: json!(codename),
            modular_content: Vec::new(),
        },
    );
    if !refs.is_empty() {
        elements.insert(
            "body".to_string(),
            Element {
                element_type: "rich_text".to_string(),
                name: "Body".to_string(),
                value: json!("<p>body</p>"),
                modular_content: refs.iter().map(|r| r.to_string()).collect(),
            },
        );
    }
    ContentItemSnapshot {
        system: ItemSystem {
            id: id.to_string(),
            name: codename.to_string(),
            codename: codename.to_string(),
            language: language.to_string(),
            content_type: content_type.to_string(),
            collection: None,
            workflow_step: None,
            last_modified: None,
        },
        elements,
    }
}

/// The article with one component and one ordinary linked item.
fn article(language: &str) -> FetchedItem {
    let mut modular = BTreeMap::new();
    modular.insert(
        "tweet_component".to_string(),
        snapshot(COMPONENT, "tweet_component", "tweet", language, &[]),
    );
    modular.insert(
        "linked_tweet".to_string(),
        snapshot(LINKED, "linked_tweet", "tweet", language, &[]),
    );
    FetchedItem::found(
        snapshot(ITEM, "on_roasts", "article", language, &["tweet_component", "linked_tweet"]),
        modular,
    )
}

fn webhook(api_name: &str, operation: &str, language: &str) -> Value {
    json!({
        "data": {
            "items": [ { "id": ITEM, "language": language, "codename": "on_roasts", "type": "article" } ],
            "taxonomies": []
        },
        "message": {
            "id": "e1fb3ea6-1eea-4c70-8bb4-8d0ae8d2e8a3",
            "project_id": PROJECT,
            "type": "content_item_variant",
            "operation": operation,
            "api_name": api_name,
            "created_timestamp": "2019-07-18T15:07:17.6823904Z"
        }
    })
}

fn setup(languages: &[&str]) -> (Arc<ScriptedFetcher>, Arc<InMemoryNodeStore>, Reconciler) {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = Arc::new(InMemoryNodeStore::new());
    let reconciler = Reconciler::new(settings(languages), fetcher.clone(), store.clone());
    (fetcher, store, reconciler)
}

async fn seed(store: &InMemoryNodeStore, fetched: &FetchedItem, slot: &str) {
    let primary = fetched.item.iter();
    for s in primary.chain(fetched.modular_content.values()) {
        store.create(build_item_node(s, slot, false).unwrap()).await.unwrap();
    }
}

async fn ids(store: &InMemoryNodeStore) -> Vec<NodeId> {
    store
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|n: LocalNode| n.id)
        .collect()
}

fn report(outcome: Outcome) -> content_sync_core::reconcile::RunReport {
    match outcome {
        Outcome::Reconciled(r) => r,
        other => panic!("expected a reconciled run, got {:?}", other),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_malformed_payloads_cause_no_mutations() {
    let (fetcher, store, reconciler) = setup(&["en"]);
    seed(&store, &article("en"), "en").await;
    let before = ids(&store).await;

    let mut no_id = webhook("delivery_preview", "upsert", "en");
    no_id["data"]["items"][0].as_object_mut().unwrap().remove("id");
    let mut no_language = webhook("delivery_preview", "archive", "en");
    no_language["data"]["items"][0].as_object_mut().unwrap().remove("language");
    let mut no_operation = webhook("delivery_preview", "upsert", "en");
    no_operation["message"].as_object_mut().unwrap().remove("operation");

    for body in [no_id, no_language, no_operation, json!({"hello": "world"})] {
        let outcome = reconciler.process(&body).await.unwrap();
        assert!(matches!(outcome, Outcome::Invalid { .. }), "got {:?}", outcome);
    }

    assert!(fetcher.calls().is_empty());
    assert_eq!(ids(&store).await, before);
    assert!(store.touched_ids().is_empty());
}

#[tokio::test]
async fn test_foreign_project_causes_no_mutations() {
    let (fetcher, store, reconciler) = setup(&["en"]);
    seed(&store, &article("en"), "en").await;
    let before = ids(&store).await;

    for (api, op) in [
        ("delivery_preview", "upsert"),
        ("delivery_preview", "archive"),
        ("delivery_production", "unpublish"),
    ] {
        let mut body = webhook(api, op, "en");
        body["message"]["project_id"] = json!("00000000-0000-0000-0000-000000000000");
        let outcome = reconciler.process(&body).await.unwrap();
        assert!(matches!(outcome, Outcome::Unsupported { .. }));
    }

    assert!(fetcher.calls().is_empty());
    assert_eq!(ids(&store).await, before);
    assert!(store.touched_ids().is_empty());
}

#[tokio::test]
async fn test_upsert_fans_out_over_every_configured_language() {
    let (fetcher, store, reconciler) = setup(&["en", "cz"]);
    fetcher.serve(ITEM, "en", article("en"));
    // cz has no variant of its own; the remote falls back to en
    fetcher.serve(ITEM, "cz", article("en"));

    let outcome = reconciler
        .process(&webhook("delivery_preview", "upsert", "en"))
        .await
        .unwrap();
    let run = report(outcome);

    assert_eq!(run.action, Action::Upsert);
    assert_eq!(
        fetcher.calls(),
        vec![
            (ITEM.to_string(), "en".to_string()),
            (ITEM.to_string(), "cz".to_string())
        ]
    );

    let primary_en = NodeId::for_item(ITEM, "en");
    let primary_cz = NodeId::for_item(ITEM, "cz");
    assert!(run.processed.contains(&primary_en));
    assert!(run.processed.contains(&primary_cz));
    // primary + 2 modular entries per language
    assert_eq!(run.processed.len(), 6);
    assert_eq!(store.len(), 6);

    let cz = store.get_by_id(&primary_cz).await.unwrap().unwrap();
    assert_eq!(cz.preferred_language(), Some("cz"));
    assert_eq!(cz.as_item().unwrap().system.language, "en");

    let mut touched = store.touched_ids();
    touched.sort();
    let mut expected = run.processed.clone();
    expected.sort();
    assert_eq!(touched, expected);
    assert_eq!(run.touched, 6);
}

#[tokio::test]
async fn test_upsert_skips_languages_that_do_not_resolve() {
    let (fetcher, store, reconciler) = setup(&["en", "de"]);
    fetcher.serve(ITEM, "en", article("en"));

    let run = report(
        reconciler
            .process(&webhook("delivery_production", "publish", "en"))
            .await
            .unwrap(),
    );

    assert_eq!(run.processed.len(), 3);
    assert!(store
        .get_by_id(&NodeId::for_item(ITEM, "de"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_delete_removes_node_and_components_while_fallback_slot_updates() {
    let (fetcher, store, reconciler) = setup(&["en", "cz"]);
    seed(&store, &article("en"), "en").await;
    seed(&store, &article("cz"), "cz").await;
    // cz is still published; en was archived
    fetcher.serve(ITEM, "cz", article("cz"));

    let run = report(
        reconciler
            .process(&webhook("delivery_preview", "archive", "en"))
            .await
            .unwrap(),
    );
    assert_eq!(run.action, Action::Delete);

    let gone = [NodeId::for_item(ITEM, "en"), NodeId::for_item(COMPONENT, "en")];
    for id in &gone {
        assert!(store.get_by_id(id).await.unwrap().is_none(), "{} should be deleted", id);
        assert!(run.processed.contains(id));
    }

    // Shared linked item survives in the en slot
    assert!(store
        .get_by_id(&NodeId::for_item(LINKED, "en"))
        .await
        .unwrap()
        .is_some());
    // The cz slot is reconciled as an upsert, component included
    for id in [
        NodeId::for_item(ITEM, "cz"),
        NodeId::for_item(COMPONENT, "cz"),
        NodeId::for_item(LINKED, "cz"),
    ] {
        assert!(store.get_by_id(&id).await.unwrap().is_some());
        assert!(run.processed.contains(&id));
    }
}

#[tokio::test]
async fn test_delete_leaves_other_slot_components_untouched() {
    let (fetcher, store, reconciler) = setup(&["en", "cz"]);
    seed(&store, &article("en"), "en").await;
    // The cz slot holds a different parent that embeds the same component
    let other = snapshot(
        "aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee",
        "on_grinding",
        "article",
        "cz",
        &["tweet_component"],
    );
    let other_node = build_item_node(&other, "cz", false).unwrap();
    let cz_component = build_item_node(
        &snapshot(COMPONENT, "tweet_component", "tweet", "cz", &[]),
        "cz",
        false,
    )
    .unwrap();
    store.create(other_node.clone()).await.unwrap();
    store.create(cz_component.clone()).await.unwrap();
    store.touch(&cz_component.id).await.unwrap();
    // Nothing resolves for the item in either language

    let run = report(
        reconciler
            .process(&webhook("delivery_preview", "archive", "en"))
            .await
            .unwrap(),
    );

    assert!(store
        .get_by_id(&NodeId::for_item(COMPONENT, "en"))
        .await
        .unwrap()
        .is_none());
    assert_eq!(store.get_by_id(&cz_component.id).await.unwrap(), Some(cz_component.clone()));
    assert!(store.get_by_id(&other_node.id).await.unwrap().is_some());
    assert!(!run.processed.contains(&cz_component.id));
    // Still carries its earlier touch, so it was never recreated
    assert!(store.touched_ids().contains(&cz_component.id));
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test]
async fn test_delete_with_fallback_updates_instead_of_deleting() {
    let (fetcher, store, reconciler) = setup(&["en"]);
    seed(&store, &article("en"), "en").await;
    // en variant was unpublished, but the remote falls back to de content
    fetcher.serve(ITEM, "en", article("de"));

    let run = report(
        reconciler
            .process(&webhook("delivery_production", "unpublish", "en"))
            .await
            .unwrap(),
    );

    let primary = store
        .get_by_id(&NodeId::for_item(ITEM, "en"))
        .await
        .unwrap()
        .expect("node should be recreated");
    assert_eq!(primary.as_item().unwrap().system.language, "de");
    assert!(store
        .get_by_id(&NodeId::for_item(COMPONENT, "en"))
        .await
        .unwrap()
        .is_some());
    assert_eq!(run.processed.len(), 3);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_delete_without_local_node_is_a_noop() {
    let (fetcher, store, reconciler) = setup(&["en"]);
    let run = report(
        reconciler
            .process(&webhook("delivery_preview", "archive", "en"))
            .await
            .unwrap(),
    );
    assert!(run.processed.is_empty());
    assert!(store.is_empty());
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn test_touch_includes_all_taxonomies_when_configured() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let store = Arc::new(InMemoryNodeStore::new());
    let mut s = settings(&["en"]);
    s.include_taxonomies = true;
    s.include_types = true;
    let reconciler = Reconciler::new(s, fetcher.clone(), store.clone());

    let taxonomy: content_sync_core::models::TaxonomyGroup = serde_json::from_value(json!({
        "system": { "id": "t1", "name": "Tags", "codename": "tags" },
        "terms": [ { "name": "Coffee", "codename": "coffee", "terms": [] } ]
    }))
    .unwrap();
    let content_type: content_sync_core::models::ContentTypeDefinition =
        serde_json::from_value(json!({
            "system": { "id": "ty1", "name": "Article", "codename": "article" },
            "elements": {}
        }))
        .unwrap();
    let taxonomy_node = build_taxonomy_node(&taxonomy).unwrap();
    let type_node = build_type_node(&content_type).unwrap();
    store.create(taxonomy_node.clone()).await.unwrap();
    store.create(type_node.clone()).await.unwrap();

    // An unrelated item that this run does not process
    let other = build_item_node(
        &snapshot("aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee", "other", "article", "en", &[]),
        "en",
        false,
    )
    .unwrap();
    store.create(other.clone()).await.unwrap();

    fetcher.serve(ITEM, "en", article("en"));
    let run = report(
        reconciler
            .process(&webhook("delivery_preview", "upsert", "en"))
            .await
            .unwrap(),
    );

    let touched = store.touched_ids();
    assert!(touched.contains(&taxonomy_node.id));
    assert!(touched.contains(&type_node.id));
    assert!(!touched.contains(&other.id));
    assert_eq!(run.touched, run.processed.len() + 2);
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let (fetcher, store, reconciler) = setup(&["en", "cz"]);
    fetcher.serve(ITEM, "en", article("en"));
    fetcher.serve(ITEM, "cz", article("cz"));
    let body = webhook("delivery_preview", "upsert", "en");

    reconciler.process(&body).await.unwrap();
    let once = store.get_all().await.unwrap();
    reconciler.process(&body).await.unwrap();
    let twice = store.get_all().await.unwrap();

    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_restore_after_archive_recreates_nodes() {
    let (fetcher, store, reconciler) = setup(&["en"]);
    fetcher.serve(ITEM, "en", article("en"));
    reconciler
        .process(&webhook("delivery_preview", "upsert", "en"))
        .await
        .unwrap();
    assert_eq!(store.len(), 3);

    fetcher.withdraw(ITEM, "en");
    reconciler
        .process(&webhook("delivery_preview", "archive", "en"))
        .await
        .unwrap();
    // the shared linked item stays behind
    assert_eq!(ids(&store).await, vec![NodeId::for_item(LINKED, "en")]);

    fetcher.serve(ITEM, "en", article("en"));
    reconciler
        .process(&webhook("delivery_preview", "restore", "en"))
        .await
        .unwrap();
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_unconfigured_event_language_still_reconciles_configured_languages() {
    let (fetcher, store, reconciler) = setup(&["en"]);
    fetcher.serve(ITEM, "en", article("en"));

    let run = report(
        reconciler
            .process(&webhook("delivery_preview", "upsert", "fr"))
            .await
            .unwrap(),
    );
    assert_eq!(run.processed.len(), 3);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_fetch_failure_propagates() {
    let store = Arc::new(InMemoryNodeStore::new());
    let reconciler = Reconciler::new(settings(&["en"]), Arc::new(FailingFetcher), store.clone());

    let err = reconciler
        .process(&webhook("delivery_preview", "upsert", "en"))
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("connection refused"));
    assert!(store.is_empty());
}
