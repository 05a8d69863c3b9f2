//! # Content Sync
//!
//! **Webhook-driven reconciliation of a local content graph against a headless CMS.**
//!
//! The CMS posts a change notification whenever a content item variant is
//! upserted, archived, restored, published, or unpublished. Content Sync
//! validates the notification, re-resolves the item in every configured
//! language (fallback included), and brings the local node graph back into
//! agreement: nodes are recreated, deleted together with their orphaned
//! components, and touched so a downstream garbage collector keeps them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────┐
//! │  CMS webhook │──▶│    Reconciler     │──▶│  SQLite   │
//! │ POST /webhook│   │ fanout + cascade  │   │  nodes    │
//! └──────────────┘   └────────┬─────────┘   └──────────┘
//!                             │
//!                             ▼
//!                    ┌──────────────────┐
//!                    │  Delivery API    │
//!                    │  (items, types)  │
//!                    └──────────────────┘
//! ```
//!
//! The reconciliation engine itself lives in `content-sync-core`; this
//! crate supplies configuration, the HTTP Delivery client, the SQLite node
//! store, the webhook server, and the `csync` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`delivery`] | Delivery API client (remote content fetcher) |
//! | [`sqlite_store`] | SQLite node store |
//! | [`source`] | Full sourcing of the local graph |
//! | [`pipeline`] | Collaborator wiring, replay and sync entry points |
//! | [`server`] | Webhook HTTP server |
//! | [`nodes`] | Node listing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod delivery;
pub mod migrate;
pub mod nodes;
pub mod pipeline;
pub mod server;
pub mod source;
pub mod sqlite_store;
