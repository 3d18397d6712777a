//! # SWKit Runtime
//!
//! The worker runtime core: a background execution context independent
//! of any page, responsible for asset caching across its lifecycle and
//! for translating push events, page messages, and notification clicks
//! into notification presentation or navigation.
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorkerContainer (page-facing surface)
//!     └── WorkerRuntime
//!             ├── dispatch(WorkerEvent)        one handler per event kind
//!             └── WorkerContext
//!                     ├── caches        (CacheStorage, versioned)
//!                     ├── network       (NetworkFetch host)
//!                     ├── clients       (open page contexts)
//!                     └── notifications (NotificationCenter)
//! ```
//!
//! Handlers receive their environment through the explicit
//! [`WorkerContext`] rather than ambient globals, so tests substitute an
//! in-memory network host and inspect the other resources directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use swkit_cache::{Cache, CacheStorage};
use swkit_common::{Result, SwError};
use swkit_notify::{
    message_descriptor, parse_message, parse_push, push_descriptor, NotificationDescriptor,
    NotificationOptions, PageMessage,
};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, trace, warn};
use url::Url;

pub mod clients;
pub mod events;
mod fetch;
pub mod notifications;
pub mod registration;

pub use clients::{Client, ClientMatchOptions, ClientType, Clients};
pub use events::{
    EventOutcome, EventType, FetchDecision, FetchRequest, FetchResponse, NotificationClickEvent,
    WaitUntil, WorkerEvent,
};
pub use notifications::{DisplayedNotification, NotificationCenter, NotificationId};
pub use registration::{PermissionState, RegistrationOptions, ServiceWorkerContainer};

// ==================== Constants ====================

/// The current cache version identifier.
pub const CACHE_VERSION: &str = "pwa-notify-v1";

/// The fixed asset set installed into the cache, as origin-relative paths.
pub const ASSET_MANIFEST: [&str; 5] = [
    "/",
    "/manifest.webmanifest",
    "/icon-192.png",
    "/icon-512.png",
    "/favicon.ico",
];

// ==================== Types ====================

/// Unique identifier for a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Service worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceWorkerState {
    /// Initial state after registration.
    #[default]
    Parsed,
    /// Installing (populating the version's cache store).
    Installing,
    /// Installed, eligible to activate immediately (skip-waiting).
    Installed,
    /// Activating (purging stale stores, claiming clients).
    Activating,
    /// Active and handling events.
    Activated,
    /// Replaced, unregistered, or failed to install.
    Redundant,
}

impl ServiceWorkerState {
    /// Whether fetch/push/message/click events may be handled.
    pub fn can_handle_events(&self) -> bool {
        matches!(self, ServiceWorkerState::Activated)
    }

    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceWorkerState::Redundant)
    }
}

impl std::fmt::Display for ServiceWorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceWorkerState::Parsed => write!(f, "parsed"),
            ServiceWorkerState::Installing => write!(f, "installing"),
            ServiceWorkerState::Installed => write!(f, "installed"),
            ServiceWorkerState::Activating => write!(f, "activating"),
            ServiceWorkerState::Activated => write!(f, "activated"),
            ServiceWorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// A lifecycle state transition, announced on the runtime's event channel.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub worker_id: WorkerId,
    pub state: ServiceWorkerState,
}

// ==================== Host Traits ====================

/// Network host: how the worker reaches the network. Substituted with an
/// in-memory fake in tests and by the smoke harness.
pub trait NetworkFetch: Send + Sync {
    /// Perform the request. `Err` is a network-level failure (offline,
    /// DNS, reset); HTTP error statuses come back as `Ok` responses.
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

// ==================== Worker Context ====================

/// The runtime's environment, passed explicitly into every handler.
#[derive(Clone)]
pub struct WorkerContext {
    /// Cache namespace shared by install/activate/fetch handlers.
    pub caches: Arc<RwLock<CacheStorage>>,

    /// Network host.
    pub network: Arc<dyn NetworkFetch>,

    /// Open page contexts.
    pub clients: Arc<RwLock<Clients>>,

    /// Platform notification presentation.
    pub notifications: Arc<RwLock<NotificationCenter>>,
}

impl WorkerContext {
    /// Create a fresh context around a network host.
    pub fn new(network: Arc<dyn NetworkFetch>) -> Self {
        Self {
            caches: Arc::new(RwLock::new(CacheStorage::new())),
            network,
            clients: Arc::new(RwLock::new(Clients::new())),
            notifications: Arc::new(RwLock::new(NotificationCenter::new())),
        }
    }
}

// ==================== Worker Runtime ====================

/// The worker runtime: one versioned cache, one dispatch table.
pub struct WorkerRuntime {
    id: WorkerId,
    version: String,
    scope: Url,
    state: RwLock<ServiceWorkerState>,
    ctx: WorkerContext,
    events_tx: mpsc::UnboundedSender<StateChange>,
}

impl WorkerRuntime {
    /// Create a runtime scoped to an origin, with its state-change
    /// channel.
    pub fn new(scope: Url, ctx: WorkerContext) -> (Self, mpsc::UnboundedReceiver<StateChange>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                id: WorkerId::new(),
                version: CACHE_VERSION.to_string(),
                scope,
                state: RwLock::new(ServiceWorkerState::Parsed),
                ctx,
                events_tx,
            },
            events_rx,
        )
    }

    /// This worker's ID.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// The cache version identifier this worker installs and serves.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The scope URL (origin) this worker governs.
    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// The runtime's environment.
    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ServiceWorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: ServiceWorkerState) {
        *self.state.write().await = state;
        info!(worker = ?self.id, %state, "worker state change");
        let _ = self.events_tx.send(StateChange {
            worker_id: self.id,
            state,
        });
    }

    async fn ensure_active(&self) -> Result<()> {
        let state = self.state().await;
        if !state.can_handle_events() {
            return Err(SwError::invalid_state(format!(
                "worker is {state}, not activated"
            )));
        }
        Ok(())
    }

    // ==================== Dispatch ====================

    /// Dispatch one event to its handler. This is the worker's single
    /// entry point: each event kind maps to exactly one handler, and
    /// side-effecting handlers come back with a [`WaitUntil`] proving
    /// their work settled before the event was considered handled.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome> {
        let event_type = event.event_type();
        trace!(worker = ?self.id, %event_type, "dispatching");

        match event {
            WorkerEvent::Install => self.handle_install().await.map(EventOutcome::Completed),
            WorkerEvent::Activate => self.handle_activate().await.map(EventOutcome::Completed),
            WorkerEvent::Fetch(request) => {
                self.handle_fetch(request).await.map(EventOutcome::Fetch)
            }
            WorkerEvent::Push(data) => self.handle_push(data).await.map(EventOutcome::Completed),
            WorkerEvent::Message(value) => self.handle_message(value).await,
            WorkerEvent::NotificationClick(click) => {
                self.handle_click(click).await.map(EventOutcome::Completed)
            }
        }
    }

    // ==================== Lifecycle Handlers ====================

    /// Install: populate a fresh store with the fixed asset set,
    /// all-or-nothing. The store is committed only after every asset
    /// fetched successfully; any failure leaves nothing behind and the
    /// worker redundant.
    async fn handle_install(&self) -> Result<WaitUntil> {
        let state = self.state().await;
        if state != ServiceWorkerState::Parsed {
            return Err(SwError::invalid_state(format!(
                "cannot install from {state}"
            )));
        }
        self.set_state(ServiceWorkerState::Installing).await;

        match self.populate_assets().await {
            Ok(cache) => {
                self.ctx.caches.write().await.commit(cache);
                // Eligible to activate immediately; no waiting for old
                // clients to close.
                self.set_state(ServiceWorkerState::Installed).await;
                Ok(WaitUntil::settled(EventType::Install))
            }
            Err(error) => {
                warn!(worker = ?self.id, %error, "install failed");
                self.set_state(ServiceWorkerState::Redundant).await;
                Err(error)
            }
        }
    }

    async fn populate_assets(&self) -> Result<Cache> {
        let mut cache = Cache::new(&self.version);
        for asset in ASSET_MANIFEST {
            let url = self
                .scope
                .join(asset)
                .map_err(|e| SwError::registration_with_source(format!("bad asset path {asset:?}"), e))?;
            let request = FetchRequest::subresource(url.clone());
            let response = self.ctx.network.fetch(&request)?;
            if !response.is_success() {
                return Err(SwError::network(format!(
                    "asset {asset} returned status {}",
                    response.status
                )));
            }
            debug!(worker = ?self.id, %url, "installed asset");
            cache.put(response.to_entry(&url));
        }
        Ok(cache)
    }

    /// Activate: delete every stale store, then claim all open clients.
    /// All deletions complete before the claim.
    async fn handle_activate(&self) -> Result<WaitUntil> {
        let state = self.state().await;
        if state != ServiceWorkerState::Installed {
            return Err(SwError::invalid_state(format!(
                "cannot activate from {state}"
            )));
        }
        self.set_state(ServiceWorkerState::Activating).await;

        let stale = self.ctx.caches.write().await.purge_except(&self.version);
        if !stale.is_empty() {
            info!(worker = ?self.id, ?stale, "purged stale cache stores");
        }

        self.ctx.clients.write().await.claim();
        self.set_state(ServiceWorkerState::Activated).await;
        Ok(WaitUntil::settled(EventType::Activate))
    }

    // ==================== Fetch Handler ====================

    async fn handle_fetch(&self, request: FetchRequest) -> Result<FetchDecision> {
        self.ensure_active().await?;
        Ok(fetch::intercept(
            &self.ctx.caches,
            self.ctx.network.as_ref(),
            &self.version,
            &self.scope,
            &request,
        )
        .await)
    }

    // ==================== Notification Handlers ====================

    /// Push: degrade through the parse tiers, never error on payload
    /// content; present with defaults, the payload's body/data/tag, and
    /// a fresh timestamp.
    async fn handle_push(&self, data: Option<Vec<u8>>) -> Result<WaitUntil> {
        self.ensure_active().await?;

        let parsed = parse_push(data.as_deref());
        let descriptor = push_descriptor(parsed, now_millis());
        self.ctx.notifications.write().await.show(descriptor);
        Ok(WaitUntil::settled(EventType::Push))
    }

    /// Message: act only on the recognized demo-notification type;
    /// everything else is a silent no-op.
    async fn handle_message(&self, value: serde_json::Value) -> Result<EventOutcome> {
        self.ensure_active().await?;

        let Some(message) = parse_message(&value) else {
            return Ok(EventOutcome::Ignored);
        };
        let PageMessage::DemoNotification {
            title,
            options,
            tag,
            data,
        } = message;

        let descriptor = message_descriptor(title, options, tag, data);
        self.ctx.notifications.write().await.show(descriptor);
        Ok(EventOutcome::Completed(WaitUntil::settled(EventType::Message)))
    }

    /// Present a notification directly (the registration-based path the
    /// page uses for persistent notifications).
    pub async fn show_notification(
        &self,
        title: &str,
        options: NotificationOptions,
    ) -> Result<NotificationId> {
        self.ensure_active().await?;
        let merged = options.merged_over(NotificationOptions::defaults());
        let id = self
            .ctx
            .notifications
            .write()
            .await
            .show(NotificationDescriptor::new(title, merged));
        Ok(id)
    }

    // ==================== Click Router ====================

    /// Click: dismiss first (by display ID, falling back to tag), then
    /// resolve the target (pressed action's mapping, then `data.url`,
    /// then `/`), then focus-and-navigate the first open window or open
    /// a new one. First-wins: later windows are never touched, even if
    /// focus or navigate fails.
    async fn handle_click(&self, click: NotificationClickEvent) -> Result<WaitUntil> {
        self.ensure_active().await?;

        {
            let mut notifications = self.ctx.notifications.write().await;
            let dismissed = click.id.map(|id| notifications.close(id)).unwrap_or(false);
            if !dismissed {
                if let Some(ref tag) = click.tag {
                    notifications.close_by_tag(tag);
                }
            }
        }

        let data = swkit_notify::ClickData::from_value(click.data.as_ref());
        let target = data.resolve_target(click.action.as_deref());
        debug!(worker = ?self.id, %target, action = click.action.as_deref().unwrap_or("-"), "routing click");

        let mut clients = self.ctx.clients.write().await;
        let options = ClientMatchOptions::windows_including_uncontrolled();
        if let Some(client) = clients.first_window_mut(&options) {
            if let Err(error) = client.focus() {
                warn!(client = %client.id, %error, "focus failed");
            }
            if !target.is_empty() {
                if let Err(error) = client.navigate(&target) {
                    warn!(client = %client.id, %error, "navigate failed");
                }
            }
        } else {
            let url = self
                .scope
                .join(&target)
                .map_err(|e| SwError::navigation_with_source(format!("invalid target {target:?}"), e))?;
            clients.open_window(url);
        }
        Ok(WaitUntil::settled(EventType::NotificationClick))
    }
}

// ==================== Helpers ====================

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
