//! Inbound webhook envelopes: structural validation, authorization, and
//! operation classification.
//!
//! A webhook body is untrusted input of unknown shape. [`parse_envelope`]
//! turns it into an [`Envelope`] in a single pass:
//!
//! | Result | Meaning |
//! |--------|---------|
//! | [`Envelope::Invalid`] | Not a change notification at all (missing ids, languages, message fields) |
//! | [`Envelope::Unsupported`] | Well-formed, but for another project, another entity type, or an unknown operation |
//! | [`Envelope::Supported`] | Authorized and classified into an [`Action`] |
//!
//! Neither of the first two is an error: foreign and malformed payloads are
//! expected and are dropped with a diagnostic.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "data": { "items": [ { "id": "…", "language": "en", "codename": "…", "type": "article" } ] },
//!   "message": {
//!     "api_name": "delivery_preview",
//!     "operation": "upsert",
//!     "project_id": "…",
//!     "type": "content_item_variant"
//!   }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// `message.type` of a content item language variant change.
pub const CONTENT_ITEM_VARIANT: &str = "content_item_variant";

/// Delivery channel that emitted the notification (`message.api_name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiChannel {
    #[serde(rename = "delivery_preview")]
    Preview,
    #[serde(rename = "delivery_production")]
    Production,
}

impl ApiChannel {
    pub fn from_api_name(api_name: &str) -> Option<Self> {
        match api_name {
            "delivery_preview" => Some(Self::Preview),
            "delivery_production" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Preview => "delivery_preview",
            Self::Production => "delivery_production",
        }
    }

    /// Operations this channel is known to emit for item variants.
    pub fn recognized_operations(&self) -> &'static [&'static str] {
        match self {
            Self::Preview => &["upsert", "archive", "restore"],
            Self::Production => &["publish", "unpublish"],
        }
    }
}

impl fmt::Display for ApiChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Reconciliation action for a supported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Upsert,
    Delete,
    Ignore,
}

/// Map a validated `(channel, operation)` pair to an [`Action`].
pub fn classify(channel: ApiChannel, operation: &str) -> Action {
    match (channel, operation) {
        (ApiChannel::Preview, "upsert" | "restore") => Action::Upsert,
        (ApiChannel::Production, "publish") => Action::Upsert,
        (ApiChannel::Preview, "archive") => Action::Delete,
        (ApiChannel::Production, "unpublish") => Action::Delete,
        _ => Action::Ignore,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════════════════

/// Raw `data.items[]` entry. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codename: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub items: Option<Vec<WebhookItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub api_name: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, rename = "type")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<String>,
}

/// The webhook body as received, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub data: Option<WebhookData>,
    #[serde(default)]
    pub message: Option<WebhookMessage>,
}

// ═══════════════════════════════════════════════════════════════════════
// Validated envelope
// ═══════════════════════════════════════════════════════════════════════

/// The item an event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    pub id: String,
    pub language: String,
}

/// A validated, authorized, and classified change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub channel: ApiChannel,
    pub operation: String,
    pub action: Action,
    /// First entry of `data.items`; the only one reconciled.
    pub item: ItemRef,
    /// Number of entries in `data.items`.
    pub batch_size: usize,
    /// The original envelope, kept for diagnostics.
    pub envelope: WebhookEnvelope,
}

/// Result of validating one webhook body.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Invalid(String),
    Unsupported(String),
    Supported(ChangeEvent),
}

/// Validate, authorize, and classify a raw webhook body.
///
/// `project_id` is the configured project; envelopes for any other project
/// are [`Envelope::Unsupported`].
pub fn parse_envelope(body: &serde_json::Value, project_id: &str) -> Envelope {
    let envelope: WebhookEnvelope = match serde_json::from_value(body.clone()) {
        Ok(e) => e,
        Err(e) => return Envelope::Invalid(format!("body is not a webhook envelope: {}", e)),
    };

    let items = match envelope.data.as_ref().and_then(|d| d.items.as_ref()) {
        Some(items) if !items.is_empty() => items,
        Some(_) => return Envelope::Invalid("data.items is empty".to_string()),
        None => return Envelope::Invalid("data.items is missing".to_string()),
    };

    let mut refs = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let id = non_empty(item.id.as_deref());
        let language = non_empty(item.language.as_deref());
        match (id, language) {
            (Some(id), Some(language)) => refs.push(ItemRef {
                id: id.to_string(),
                language: language.to_string(),
            }),
            (None, _) => return Envelope::Invalid(format!("data.items[{}].id is missing", i)),
            (_, None) => {
                return Envelope::Invalid(format!("data.items[{}].language is missing", i))
            }
        }
    }

    let message = match envelope.message.as_ref() {
        Some(m) => m,
        None => return Envelope::Invalid("message is missing".to_string()),
    };
    let api_name = match non_empty(message.api_name.as_deref()) {
        Some(a) => a,
        None => return Envelope::Invalid("message.api_name is missing".to_string()),
    };
    let event_project = match non_empty(message.project_id.as_deref()) {
        Some(p) => p,
        None => return Envelope::Invalid("message.project_id is missing".to_string()),
    };
    let operation = match message.operation.as_deref() {
        Some(op) => op,
        None => return Envelope::Invalid("message.operation is missing".to_string()),
    };

    if event_project != project_id {
        return Envelope::Unsupported(format!(
            "project '{}' does not match configured project",
            event_project
        ));
    }

    let message_type = message.message_type.as_deref().unwrap_or("");
    if message_type != CONTENT_ITEM_VARIANT {
        return Envelope::Unsupported(format!("message type '{}' is not handled", message_type));
    }

    let channel = match ApiChannel::from_api_name(api_name) {
        Some(c) => c,
        None => return Envelope::Unsupported(format!("unknown api_name '{}'", api_name)),
    };
    if !channel.recognized_operations().contains(&operation) {
        return Envelope::Unsupported(format!(
            "operation '{}' is not recognized for {}",
            operation, channel
        ));
    }

    let batch_size = refs.len();
    let item = refs.swap_remove(0);
    Envelope::Supported(ChangeEvent {
        channel,
        operation: operation.to_string(),
        action: classify(channel, operation),
        item,
        batch_size,
        envelope,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
