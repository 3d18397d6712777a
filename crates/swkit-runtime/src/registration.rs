//! Page-facing registration surface.
//!
//! Models the collaboration points a page has with the worker:
//! register/await-ready, permission-gated show-notification, and
//! post-message. Capability and permission failures surface to the
//! caller as errors; nothing here panics the page.

use crate::{
    EventOutcome, NetworkFetch, NotificationId, ServiceWorkerState, StateChange, WorkerContext,
    WorkerEvent, WorkerRuntime,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use swkit_common::{Result, SwError};
use swkit_notify::NotificationOptions;
use tokio::sync::{mpsc, RwLock};
use tracing::info;
use url::Url;

/// Notification permission state, as the page sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    /// Not asked yet.
    #[default]
    Default,
    /// The user allowed notifications.
    Granted,
    /// The user blocked notifications.
    Denied,
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::Default => write!(f, "default"),
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
        }
    }
}

/// Options for registration.
#[derive(Debug, Clone, Default)]
pub struct RegistrationOptions {
    /// Scope URL; derived from the script's directory when absent.
    pub scope: Option<String>,
}

/// The page's handle on the worker: registration, readiness, permission,
/// and the trigger surface.
pub struct ServiceWorkerContainer {
    network: Arc<dyn NetworkFetch>,
    registration: RwLock<Option<Arc<WorkerRuntime>>>,
    state_events: RwLock<Option<mpsc::UnboundedReceiver<StateChange>>>,
    permission: RwLock<PermissionState>,
    notifications_supported: bool,
}

impl ServiceWorkerContainer {
    /// Create a container on a supporting platform.
    pub fn new(network: Arc<dyn NetworkFetch>) -> Self {
        Self {
            network,
            registration: RwLock::new(None),
            state_events: RwLock::new(None),
            permission: RwLock::new(PermissionState::Default),
            notifications_supported: true,
        }
    }

    /// Create a container whose platform lacks the Notification API.
    pub fn without_notification_support(network: Arc<dyn NetworkFetch>) -> Self {
        Self {
            notifications_supported: false,
            ..Self::new(network)
        }
    }

    /// Current permission state.
    pub async fn permission(&self) -> PermissionState {
        *self.permission.read().await
    }

    /// Prompt for permission. The simulated user always allows from
    /// `Default`; `Denied` stays denied.
    pub async fn request_permission(&self) -> Result<PermissionState> {
        if !self.notifications_supported {
            return Err(SwError::unsupported("Notification API is not available"));
        }
        let mut permission = self.permission.write().await;
        if *permission == PermissionState::Default {
            *permission = PermissionState::Granted;
            info!("notification permission granted");
        }
        Ok(*permission)
    }

    /// Register the worker and drive it through install and activate.
    /// Install failure propagates and leaves no active registration.
    pub async fn register(
        &self,
        script_url: &str,
        options: RegistrationOptions,
    ) -> Result<Arc<WorkerRuntime>> {
        let script = Url::parse(script_url)
            .map_err(|e| SwError::registration_with_source(format!("bad script URL {script_url:?}"), e))?;

        let scope = match options.scope {
            Some(ref s) => Url::parse(s)
                .map_err(|e| SwError::registration_with_source(format!("bad scope URL {s:?}"), e))?,
            // Default scope is the script's directory.
            None => script
                .join("./")
                .map_err(|e| SwError::registration_with_source("cannot derive scope", e))?,
        };

        let ctx = WorkerContext::new(self.network.clone());
        let (runtime, events_rx) = WorkerRuntime::new(scope.clone(), ctx);
        let runtime = Arc::new(runtime);
        *self.state_events.write().await = Some(events_rx);

        info!(%scope, script = %script, "registering service worker");
        runtime.dispatch(WorkerEvent::Install).await?;
        runtime.dispatch(WorkerEvent::Activate).await?;

        *self.registration.write().await = Some(runtime.clone());
        Ok(runtime)
    }

    /// The active worker, once registration has settled.
    pub async fn ready(&self) -> Result<Arc<WorkerRuntime>> {
        let registration = self.registration.read().await;
        let runtime = registration
            .as_ref()
            .ok_or_else(|| SwError::registration("no service worker registration"))?;
        if runtime.state().await != ServiceWorkerState::Activated {
            return Err(SwError::invalid_state(format!(
                "service worker is {}, not activated",
                runtime.state().await
            )));
        }
        Ok(runtime.clone())
    }

    /// Take the runtime's state-change stream (for observers).
    pub async fn take_state_events(&self) -> Option<mpsc::UnboundedReceiver<StateChange>> {
        self.state_events.write().await.take()
    }

    /// Show a persistent notification through the registration.
    /// Requires granted permission; the caller's options win over the
    /// default baseline.
    pub async fn show_notification(
        &self,
        title: &str,
        options: NotificationOptions,
    ) -> Result<NotificationId> {
        self.ensure_permission().await?;
        let runtime = self.ready().await?;
        runtime.show_notification(title, options).await
    }

    /// Post a message to the worker. Unrecognized messages are ignored,
    /// not errors.
    pub async fn post_message(&self, message: JsonValue) -> Result<EventOutcome> {
        let runtime = self.ready().await?;
        runtime.dispatch(WorkerEvent::Message(message)).await
    }

    async fn ensure_permission(&self) -> Result<()> {
        if !self.notifications_supported {
            return Err(SwError::unsupported("Notification API is not available"));
        }
        match self.permission().await {
            PermissionState::Granted => Ok(()),
            PermissionState::Denied => {
                Err(SwError::permission_denied("notification permission denied"))
            }
            PermissionState::Default => Err(SwError::permission_denied(
                "notification permission has not been granted",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchRequest, FetchResponse, ASSET_MANIFEST};
    use serde_json::json;

    struct AssetNetwork;

    impl NetworkFetch for AssetNetwork {
        fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
            if ASSET_MANIFEST.contains(&request.url.path()) {
                Ok(FetchResponse::ok(request.url.path().as_bytes().to_vec()))
            } else {
                Err(SwError::network("unknown asset"))
            }
        }
    }

    fn network() -> Arc<AssetNetwork> {
        Arc::new(AssetNetwork)
    }

    #[tokio::test]
    async fn test_register_derives_scope_from_script_directory() {
        let container = ServiceWorkerContainer::new(network());
        let runtime = container
            .register("https://app.example/sw.js", RegistrationOptions::default())
            .await
            .unwrap();

        assert_eq!(runtime.scope().as_str(), "https://app.example/");
        assert_eq!(runtime.state().await, ServiceWorkerState::Activated);
        assert!(container.ready().await.is_ok());
    }

    #[tokio::test]
    async fn test_register_nested_script_scope() {
        struct AnyNetwork;
        impl NetworkFetch for AnyNetwork {
            fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
                Ok(FetchResponse::ok(request.url.path().as_bytes().to_vec()))
            }
        }

        let container = ServiceWorkerContainer::new(Arc::new(AnyNetwork));
        let runtime = container
            .register("https://app.example/app/sw.js", RegistrationOptions::default())
            .await
            .unwrap();

        assert_eq!(runtime.scope().as_str(), "https://app.example/app/");
    }

    #[tokio::test]
    async fn test_ready_before_register_fails() {
        let container = ServiceWorkerContainer::new(network());
        assert!(matches!(
            container.ready().await,
            Err(SwError::Registration { .. })
        ));
    }

    #[tokio::test]
    async fn test_show_notification_requires_permission() {
        let container = ServiceWorkerContainer::new(network());
        container
            .register("https://app.example/sw.js", RegistrationOptions::default())
            .await
            .unwrap();

        let result = container
            .show_notification("แจ้งเตือนแบบทันที", NotificationOptions::default())
            .await;
        assert!(matches!(result, Err(SwError::PermissionDenied(_))));

        assert_eq!(
            container.request_permission().await.unwrap(),
            PermissionState::Granted
        );
        assert!(container
            .show_notification("แจ้งเตือนแบบทันที", NotificationOptions::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_denied_permission_stays_denied() {
        let container = ServiceWorkerContainer::new(network());
        *container.permission.write().await = PermissionState::Denied;

        assert_eq!(
            container.request_permission().await.unwrap(),
            PermissionState::Denied
        );

        container
            .register("https://app.example/sw.js", RegistrationOptions::default())
            .await
            .unwrap();
        let result = container
            .show_notification("x", NotificationOptions::default())
            .await;
        assert!(matches!(result, Err(SwError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_unsupported_platform_surfaces_error() {
        let container = ServiceWorkerContainer::without_notification_support(network());
        assert!(matches!(
            container.request_permission().await,
            Err(SwError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_post_message_routes_to_worker() {
        let container = ServiceWorkerContainer::new(network());
        let runtime = container
            .register("https://app.example/sw.js", RegistrationOptions::default())
            .await
            .unwrap();

        let outcome = container
            .post_message(json!({"type": "demo-notification", "title": "X"}))
            .await
            .unwrap();
        assert!(outcome.is_completed());

        let outcome = container.post_message(json!({"type": "other"})).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Ignored));

        assert_eq!(runtime.context().notifications.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_install_leaves_no_registration() {
        struct DeadNetwork;
        impl NetworkFetch for DeadNetwork {
            fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse> {
                Err(SwError::network("unreachable"))
            }
        }

        let container = ServiceWorkerContainer::new(Arc::new(DeadNetwork));
        let result = container
            .register("https://app.example/sw.js", RegistrationOptions::default())
            .await;
        assert!(result.is_err());
        assert!(container.ready().await.is_err());
    }
}
