//! Worker events and their outcomes.
//!
//! Every external stimulus reaching the worker is one `WorkerEvent`
//! variant; the runtime's dispatch table maps each variant to its
//! handler. Side-effecting handlers return a [`WaitUntil`] handle so the
//! host knows the event was held open until the work settled.

use crate::notifications::NotificationId;
use hashbrown::HashMap;
use serde_json::Value as JsonValue;
use std::time::Instant;
use swkit_cache::CacheEntry;
use url::Url;

// ==================== Event Types ====================

/// Event kind identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Install,
    Activate,
    Fetch,
    Push,
    Message,
    NotificationClick,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Install => write!(f, "install"),
            EventType::Activate => write!(f, "activate"),
            EventType::Fetch => write!(f, "fetch"),
            EventType::Push => write!(f, "push"),
            EventType::Message => write!(f, "message"),
            EventType::NotificationClick => write!(f, "notificationclick"),
        }
    }
}

// ==================== Fetch ====================

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Request URL.
    pub url: Url,

    /// Request method (uppercase).
    pub method: String,

    /// Request headers.
    pub headers: HashMap<String, String>,

    /// Whether this is a top-level navigation.
    pub is_navigation: bool,

    /// Originating client, when known.
    pub client_id: Option<String>,
}

impl FetchRequest {
    /// A top-level navigation GET.
    pub fn navigation(url: Url) -> Self {
        Self {
            url,
            method: "GET".to_string(),
            headers: HashMap::new(),
            is_navigation: true,
            client_id: None,
        }
    }

    /// A subresource GET.
    pub fn subresource(url: Url) -> Self {
        Self {
            url,
            method: "GET".to_string(),
            headers: HashMap::new(),
            is_navigation: false,
            client_id: None,
        }
    }

    /// A non-GET request (never intercepted).
    pub fn with_method(url: Url, method: &str) -> Self {
        Self {
            url,
            method: method.to_ascii_uppercase(),
            headers: HashMap::new(),
            is_navigation: false,
            client_id: None,
        }
    }

    /// Whether the interception policy applies at all.
    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// A response produced by the interception policy.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Status code (0 for a synthesized network error).
    pub status: u16,

    /// Status text.
    pub status_text: String,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Vec<u8>,

    /// Whether served from the cache store.
    pub from_cache: bool,
}

impl FetchResponse {
    /// An ordinary success response.
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: HashMap::new(),
            body,
            from_cache: false,
        }
    }

    /// The synthesized response returned when every fallback is
    /// exhausted. Reported to the requester, never thrown.
    pub fn network_error() -> Self {
        Self {
            status: 0,
            status_text: "Network Error".to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
            from_cache: false,
        }
    }

    /// Rehydrate a cached capture.
    pub fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            status: entry.status,
            status_text: "OK".to_string(),
            headers: entry.headers.clone(),
            body: entry.body.clone(),
            from_cache: true,
        }
    }

    /// Capture this response for the cache store (clone-and-put).
    pub fn to_entry(&self, url: &Url) -> CacheEntry {
        CacheEntry::capture(url.as_str(), self.status, self.headers.clone(), self.body.clone())
    }

    /// Whether the status is a success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What the interception policy decided for a fetch event.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchDecision {
    /// Serve this response.
    Respond(FetchResponse),
    /// Not intercepted; the platform fetches as usual.
    Passthrough,
}

// ==================== Notification Click ====================

/// A user's interaction with a displayed notification.
#[derive(Debug, Clone, Default)]
pub struct NotificationClickEvent {
    /// Display ID of the clicked notification, when the platform
    /// reports one. Dismissal prefers this over the tag.
    pub id: Option<NotificationId>,

    /// Tag of the clicked notification.
    pub tag: Option<String>,

    /// The notification's attached data.
    pub data: Option<JsonValue>,

    /// Action button pressed, if any (body click otherwise).
    pub action: Option<String>,
}

impl NotificationClickEvent {
    /// Create a body-click event.
    pub fn new(tag: Option<String>, data: Option<JsonValue>) -> Self {
        Self {
            id: None,
            tag,
            data,
            action: None,
        }
    }

    /// Set the clicked notification's display ID.
    pub fn with_id(mut self, id: NotificationId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the pressed action.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

// ==================== Worker Events ====================

/// An external stimulus delivered to the worker runtime.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// New worker version installing.
    Install,
    /// Installed version activating.
    Activate,
    /// Intercepted request.
    Fetch(FetchRequest),
    /// Push delivery, with opaque payload bytes if any.
    Push(Option<Vec<u8>>),
    /// Inter-context message from a page.
    Message(JsonValue),
    /// Notification interaction.
    NotificationClick(NotificationClickEvent),
}

impl WorkerEvent {
    /// The event kind, keying the dispatch table.
    pub fn event_type(&self) -> EventType {
        match self {
            WorkerEvent::Install => EventType::Install,
            WorkerEvent::Activate => EventType::Activate,
            WorkerEvent::Fetch(_) => EventType::Fetch,
            WorkerEvent::Push(_) => EventType::Push,
            WorkerEvent::Message(_) => EventType::Message,
            WorkerEvent::NotificationClick(_) => EventType::NotificationClick,
        }
    }
}

// ==================== Outcomes ====================

/// Completion handle for a side-effecting handler. Handlers construct it
/// only after all of their asynchronous work has settled, so holding one
/// is proof the event kept the runtime alive to completion.
#[derive(Debug)]
pub struct WaitUntil {
    event: EventType,
    settled_at: Instant,
}

impl WaitUntil {
    /// Mark the handler's work for `event` as settled.
    pub(crate) fn settled(event: EventType) -> Self {
        Self {
            event,
            settled_at: Instant::now(),
        }
    }

    /// The event kind this handle kept alive.
    pub fn event(&self) -> EventType {
        self.event
    }

    /// When the work settled.
    pub fn settled_at(&self) -> Instant {
        self.settled_at
    }
}

/// The result of dispatching one worker event.
#[derive(Debug)]
pub enum EventOutcome {
    /// Side effects ran to completion.
    Completed(WaitUntil),
    /// The interception policy's decision for a fetch event.
    Fetch(FetchDecision),
    /// Not addressed to this worker (unrecognized message type); a
    /// silent no-op, not an error.
    Ignored,
}

impl EventOutcome {
    /// Whether the event produced side effects.
    pub fn is_completed(&self) -> bool {
        matches!(self, EventOutcome::Completed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let url = Url::parse("https://app.example/").unwrap();
        assert_eq!(WorkerEvent::Install.event_type(), EventType::Install);
        assert_eq!(
            WorkerEvent::Fetch(FetchRequest::navigation(url)).event_type(),
            EventType::Fetch
        );
        assert_eq!(WorkerEvent::Push(None).event_type(), EventType::Push);
        assert_eq!(format!("{}", EventType::NotificationClick), "notificationclick");
    }

    #[test]
    fn test_request_method_normalized() {
        let url = Url::parse("https://app.example/api").unwrap();
        let request = FetchRequest::with_method(url, "post");
        assert_eq!(request.method, "POST");
        assert!(!request.is_get());
    }

    #[test]
    fn test_response_capture_round_trip() {
        let url = Url::parse("https://app.example/icon-192.png").unwrap();
        let response = FetchResponse::ok(b"png".to_vec());
        let entry = response.to_entry(&url);

        assert_eq!(entry.url, "https://app.example/icon-192.png");
        let rehydrated = FetchResponse::from_entry(&entry);
        assert_eq!(rehydrated.body, b"png");
        assert!(rehydrated.from_cache);
    }

    #[test]
    fn test_network_error_response() {
        let response = FetchResponse::network_error();
        assert_eq!(response.status, 0);
        assert!(!response.is_success());
    }
}
