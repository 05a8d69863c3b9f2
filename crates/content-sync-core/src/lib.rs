//! # Content Sync Core
//!
//! Shared, runtime-agnostic logic for Content Sync: the inbound webhook
//! envelope, the local node model, the node store and content fetcher
//! traits, and the reconciliation engine that keeps a locally cached,
//! multi-language content graph in agreement with the remote CMS.
//!
//! This crate contains no tokio, sqlx, HTTP client, or filesystem I/O.
//! Storage and remote access are injected through [`store::NodeStore`]
//! and [`fetcher::ContentFetcher`].
//!
//! ## Pipeline
//!
//! ```text
//! body ─▶ envelope::parse_envelope ─▶ Envelope::Supported(event)
//!                                          │
//!                    ┌─────────────────────┤
//!                    ▼                     ▼
//!              Upsert path           Delete path ──▶ cascade
//!                    └──── per-language fanout ────┘
//!                                 │
//!                                 ▼
//!                          touch propagation
//! ```

pub mod cascade;
pub mod component;
pub mod envelope;
pub mod fetcher;
pub mod models;
pub mod node;
pub mod reconcile;
pub mod store;
pub mod touch;
