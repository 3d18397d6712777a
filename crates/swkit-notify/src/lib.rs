//! # SWKit Notify
//!
//! Notification data model for the SWKit worker runtime.
//!
//! ## Features
//!
//! - **NotificationDescriptor**: title + options bag with layered merging
//!   over a fixed default baseline (icon, badge, lang, vibration)
//! - **Push parsing**: total three-tier pipeline (JSON, text, fallback)
//!   that never errors regardless of payload bytes
//! - **Page messages**: the `demo-notification` contract; any other
//!   message type fails decoding and is ignored
//! - **Click data**: action-to-URL resolution with first-match precedence

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::trace;

// ==================== Defaults ====================

/// Default notification icon path.
pub const DEFAULT_ICON: &str = "/icon-192.png";

/// Default notification badge path.
pub const DEFAULT_BADGE: &str = "/icon-192.png";

/// Default notification language.
pub const DEFAULT_LANG: &str = "th";

/// Default vibration pattern (ms on/off/on).
pub const DEFAULT_VIBRATION: [u32; 3] = [80, 30, 80];

/// Title used when a push payload carries none.
pub const PUSH_FALLBACK_TITLE: &str = "Push Notification";

/// Body used when a push payload carries none at all.
pub const PUSH_FALLBACK_BODY: &str = "ข้อความตัวอย่างจาก service worker";

/// Title used when a page message carries none.
pub const MESSAGE_FALLBACK_TITLE: &str = "แจ้งเตือนจาก Service Worker";

/// Tag grouping push-triggered notifications.
pub const PUSH_TAG: &str = "demo-push";

/// Tag grouping message-triggered notifications.
pub const MESSAGE_TAG: &str = "demo-message";

/// The only inter-context message type the worker acts on.
pub const DEMO_MESSAGE_TYPE: &str = "demo-notification";

// ==================== Notification Options ====================

/// An action button on a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Action identifier reported back on click.
    pub action: String,

    /// Button label.
    pub title: String,

    /// Optional button icon path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// The options bag of a notification descriptor.
///
/// Every field is optional; merging overlays a sparse bag over a base,
/// with the overlay's fields winning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Grouping key controlling replace-on-renotify.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Opaque payload, only meaningful to the click handler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<NotificationAction>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrate: Option<Vec<u32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub renotify: Option<bool>,

    /// Presentation timestamp (ms since epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl NotificationOptions {
    /// The fixed default baseline every trigger merges against.
    pub fn defaults() -> Self {
        Self {
            icon: Some(DEFAULT_ICON.to_string()),
            badge: Some(DEFAULT_BADGE.to_string()),
            lang: Some(DEFAULT_LANG.to_string()),
            vibrate: Some(DEFAULT_VIBRATION.to_vec()),
            ..Default::default()
        }
    }

    /// Overlay `self` on top of `base`; fields set in `self` win.
    pub fn merged_over(self, base: Self) -> Self {
        Self {
            body: self.body.or(base.body),
            icon: self.icon.or(base.icon),
            badge: self.badge.or(base.badge),
            image: self.image.or(base.image),
            lang: self.lang.or(base.lang),
            tag: self.tag.or(base.tag),
            data: self.data.or(base.data),
            actions: self.actions.or(base.actions),
            vibrate: self.vibrate.or(base.vibrate),
            require_interaction: self.require_interaction.or(base.require_interaction),
            renotify: self.renotify.or(base.renotify),
            timestamp: self.timestamp.or(base.timestamp),
        }
    }
}

/// A user-visible notification: title plus options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDescriptor {
    pub title: String,
    pub options: NotificationOptions,
}

impl NotificationDescriptor {
    /// Create a descriptor.
    pub fn new(title: impl Into<String>, options: NotificationOptions) -> Self {
        Self {
            title: title.into(),
            options,
        }
    }

    /// The tag this notification is grouped under, if any.
    pub fn tag(&self) -> Option<&str> {
        self.options.tag.as_deref()
    }
}

// ==================== Push Payload ====================

/// Structured push payload as delivered over the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<JsonValue>,
    pub tag: Option<String>,
}

/// The outcome of push parsing: always a presentable title/body pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPush {
    pub title: String,
    pub body: String,
    pub data: Option<JsonValue>,
    pub tag: Option<String>,
}

impl ParsedPush {
    /// The final fallback tier: no payload, or nothing decodable.
    pub fn fallback() -> Self {
        Self {
            title: PUSH_FALLBACK_TITLE.to_string(),
            body: PUSH_FALLBACK_BODY.to_string(),
            data: None,
            tag: None,
        }
    }
}

/// Tier 1: structured JSON object.
fn parse_push_json(bytes: &[u8]) -> Option<ParsedPush> {
    let payload: PushPayload = serde_json::from_slice(bytes).ok()?;
    Some(ParsedPush {
        title: payload.title.unwrap_or_else(|| PUSH_FALLBACK_TITLE.to_string()),
        body: payload.body.unwrap_or_else(|| PUSH_FALLBACK_BODY.to_string()),
        data: payload.data,
        tag: payload.tag,
    })
}

/// Tier 2: plain UTF-8 text wrapped as the body.
fn parse_push_text(bytes: &[u8]) -> Option<ParsedPush> {
    let text = std::str::from_utf8(bytes).ok()?;
    Some(ParsedPush {
        title: PUSH_FALLBACK_TITLE.to_string(),
        body: text.to_string(),
        data: None,
        tag: None,
    })
}

/// Parse a push payload. Total: every input degrades through the tiers
/// (JSON, then text, then fixed fallback) and none of them can fail out.
pub fn parse_push(data: Option<&[u8]>) -> ParsedPush {
    let Some(bytes) = data else {
        return ParsedPush::fallback();
    };

    parse_push_json(bytes)
        .or_else(|| parse_push_text(bytes))
        .unwrap_or_else(ParsedPush::fallback)
}

/// Build the descriptor for a push trigger: defaults, then the payload's
/// body/data/tag (or the push tag), then a fresh timestamp.
pub fn push_descriptor(parsed: ParsedPush, timestamp: u64) -> NotificationDescriptor {
    let options = NotificationOptions {
        body: Some(parsed.body),
        data: Some(parsed.data.unwrap_or_else(|| JsonValue::Object(Default::default()))),
        tag: Some(parsed.tag.unwrap_or_else(|| PUSH_TAG.to_string())),
        timestamp: Some(timestamp),
        ..Default::default()
    }
    .merged_over(NotificationOptions::defaults());

    NotificationDescriptor::new(parsed.title, options)
}

// ==================== Page Messages ====================

/// Inter-context message from a page. Only `type: "demo-notification"`
/// decodes; every other shape is a decode failure the caller ignores.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
    #[serde(rename = "demo-notification")]
    DemoNotification {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        options: Option<NotificationOptions>,
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        data: Option<JsonValue>,
    },
}

/// Decode a page message. `None` means "not for us": a silent no-op,
/// not an error.
pub fn parse_message(value: &JsonValue) -> Option<PageMessage> {
    match serde_json::from_value(value.clone()) {
        Ok(message) => Some(message),
        Err(_) => {
            trace!("ignoring unrecognized page message");
            None
        }
    }
}

/// Build the descriptor for a message trigger. Merge order, lowest to
/// highest precedence: defaults, message tag (or the message tag
/// default), message data, caller-supplied options.
pub fn message_descriptor(
    title: Option<String>,
    options: Option<NotificationOptions>,
    tag: Option<String>,
    data: Option<JsonValue>,
) -> NotificationDescriptor {
    let base = NotificationOptions {
        tag: Some(tag.unwrap_or_else(|| MESSAGE_TAG.to_string())),
        data: Some(data.unwrap_or_else(|| JsonValue::Object(Default::default()))),
        ..Default::default()
    }
    .merged_over(NotificationOptions::defaults());

    let merged = options.unwrap_or_default().merged_over(base);

    NotificationDescriptor::new(
        title.unwrap_or_else(|| MESSAGE_FALLBACK_TITLE.to_string()),
        merged,
    )
}

// ==================== Click Data ====================

/// The `data` payload consulted when a notification is clicked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickData {
    /// Default navigation target.
    pub url: Option<String>,

    /// Per-action navigation targets, keyed by action identifier.
    pub actions: HashMap<String, String>,
}

impl ClickData {
    /// Extract click data from a notification's opaque payload. Shapes
    /// that don't match decode as empty data, never as an error.
    pub fn from_value(value: Option<&JsonValue>) -> Self {
        value
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Resolve the navigation target: the pressed action's mapping, then
    /// the default URL, then the root path. Empty strings fall through.
    pub fn resolve_target(&self, action: Option<&str>) -> String {
        action
            .filter(|a| !a.is_empty())
            .and_then(|a| self.actions.get(a))
            .filter(|u| !u.is_empty())
            .cloned()
            .or_else(|| self.url.clone().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| "/".to_string())
    }
}
