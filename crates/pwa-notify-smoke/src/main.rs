//! # PWA Notify Smoke Harness
//!
//! Plays the page-controller role against the worker runtime end to end:
//! registration through install and activate, the six demo notification
//! flows, push payload tiers, offline navigation fallback, and click
//! routing. Prints a JSON summary and exits non-zero on any failure.

mod manifest;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context as _};
use serde_json::json;
use swkit_common::logging::{init_logging, LogConfig};
use swkit_notify::{NotificationAction, NotificationOptions, DEMO_MESSAGE_TYPE};
use swkit_runtime::{
    EventOutcome, FetchDecision, FetchRequest, FetchResponse, NetworkFetch,
    NotificationClickEvent, RegistrationOptions, ServiceWorkerContainer, WorkerEvent,
};
use tracing::{error, info};
use url::Url;

const ORIGIN: &str = "https://app.example";
const INDEX_BODY: &[u8] = b"<!doctype html><title>PWA Notify</title>";

// ==================== In-Memory Origin ====================

/// Serves the demo origin from memory so the harness runs hermetically.
struct DemoOrigin {
    routes: Mutex<HashMap<String, Vec<u8>>>,
    offline: AtomicBool,
}

impl DemoOrigin {
    fn new() -> anyhow::Result<Self> {
        let mut routes = HashMap::new();
        routes.insert("/".to_string(), INDEX_BODY.to_vec());
        routes.insert(
            "/manifest.webmanifest".to_string(),
            serde_json::to_vec(&manifest::demo_manifest()).context("serialize manifest")?,
        );
        routes.insert("/icon-192.png".to_string(), b"png:icon-192".to_vec());
        routes.insert("/icon-512.png".to_string(), b"png:icon-512".to_vec());
        routes.insert("/favicon.ico".to_string(), b"ico:favicon".to_vec());
        Ok(Self {
            routes: Mutex::new(routes),
            offline: AtomicBool::new(false),
        })
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl NetworkFetch for DemoOrigin {
    fn fetch(&self, request: &FetchRequest) -> swkit_common::Result<FetchResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(swkit_common::SwError::network("origin unreachable"));
        }
        let routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes.get(request.url.path()) {
            Some(body) => Ok(FetchResponse::ok(body.clone())),
            None => Ok(FetchResponse {
                status: 404,
                status_text: "Not Found".to_string(),
                headers: Default::default(),
                body: Vec::new(),
                from_cache: false,
            }),
        }
    }
}

// ==================== Scenario Runner ====================

struct ScenarioOutcome {
    name: &'static str,
    passed: bool,
    detail: String,
}

struct Harness {
    origin: Arc<DemoOrigin>,
    container: ServiceWorkerContainer,
}

impl Harness {
    async fn boot() -> anyhow::Result<Self> {
        let origin = Arc::new(DemoOrigin::new()?);
        let container = ServiceWorkerContainer::new(origin.clone());
        container
            .register(&format!("{}/sw.js", ORIGIN), RegistrationOptions::default())
            .await
            .context("register worker")?;

        if let Some(mut events) = container.take_state_events().await {
            while let Ok(change) = events.try_recv() {
                info!(worker = ?change.worker_id, state = %change.state, "lifecycle");
            }
        }

        container.request_permission().await.context("permission")?;
        Ok(Self { origin, container })
    }

    async fn runtime(&self) -> anyhow::Result<Arc<swkit_runtime::WorkerRuntime>> {
        self.container.ready().await.context("worker not ready")
    }

    async fn displayed_tag(&self, tag: &str) -> anyhow::Result<swkit_notify::NotificationDescriptor> {
        let runtime = self.runtime().await?;
        let center = runtime.context().notifications.read().await;
        center
            .get_by_tag(tag)
            .map(|shown| shown.descriptor.clone())
            .with_context(|| format!("no displayed notification tagged {tag}"))
    }
}

// ==================== Scenarios ====================

/// Page-driven notification, the plain `new Notification(...)` path.
async fn immediate_notification(h: &Harness) -> anyhow::Result<()> {
    let options = NotificationOptions {
        body: Some("ตัวอย่างจากหน้าเว็บโดยตรง".to_string()),
        tag: Some("client-basic".to_string()),
        renotify: Some(true),
        ..NotificationOptions::default()
    };
    h.container
        .show_notification("แจ้งเตือนแบบทันที", options)
        .await?;

    let shown = h.displayed_tag("client-basic").await?;
    if shown.options.icon.as_deref() != Some("/icon-192.png") {
        bail!("default icon not applied: {:?}", shown.options.icon);
    }
    if shown.options.renotify != Some(true) {
        bail!("renotify override lost");
    }
    Ok(())
}

async fn notification_with_image(h: &Harness) -> anyhow::Result<()> {
    let options = NotificationOptions {
        body: Some("ภาพถูกโหลดผ่าน Notification API".to_string()),
        image: Some("/icon-512.png".to_string()),
        tag: Some("with-image".to_string()),
        ..NotificationOptions::default()
    };
    h.container.show_notification("แจ้งเตือนพร้อมรูป", options).await?;

    let shown = h.displayed_tag("with-image").await?;
    if shown.options.image.as_deref() != Some("/icon-512.png") {
        bail!("image missing from displayed options");
    }
    Ok(())
}

async fn persistent_notification(h: &Harness) -> anyhow::Result<()> {
    let options = NotificationOptions {
        body: Some("ยิงจาก service worker (registration.showNotification)".to_string()),
        tag: Some("persistent".to_string()),
        require_interaction: Some(true),
        data: Some(json!({ "url": "/" })),
        ..NotificationOptions::default()
    };
    h.container.show_notification("แจ้งเตือนถาวร", options).await?;

    let shown = h.displayed_tag("persistent").await?;
    if shown.options.require_interaction != Some(true) {
        bail!("requireInteraction not preserved");
    }
    Ok(())
}

async fn badge_and_vibration(h: &Harness) -> anyhow::Result<()> {
    let options = NotificationOptions {
        body: Some("ตัวอย่าง pattern การสั่น + badge".to_string()),
        tag: Some("badge-demo".to_string()),
        vibrate: Some(vec![80, 30, 120, 30, 80]),
        ..NotificationOptions::default()
    };
    h.container.show_notification("Badge + การสั่น", options).await?;

    let shown = h.displayed_tag("badge-demo").await?;
    if shown.options.vibrate.as_deref() != Some(&[80, 30, 120, 30, 80][..]) {
        bail!("vibration pattern not preserved: {:?}", shown.options.vibrate);
    }
    if shown.options.badge.as_deref() != Some("/icon-192.png") {
        bail!("default badge not applied");
    }
    Ok(())
}

/// Page-side timer followed by a `postMessage` into the worker.
async fn scheduled_message(h: &Harness) -> anyhow::Result<()> {
    tokio::time::sleep(Duration::from_millis(400)).await;

    let outcome = h
        .container
        .post_message(json!({
            "type": DEMO_MESSAGE_TYPE,
            "title": "แจ้งเตือนแบบตั้งเวลา",
            "options": { "body": "ส่งผ่าน postMessage -> service worker" },
            "tag": "scheduled-demo",
            "data": { "url": "/" },
        }))
        .await?;
    if !outcome.is_completed() {
        bail!("demo-notification message was not handled");
    }
    h.displayed_tag("scheduled-demo").await?;

    let stray = h.container.post_message(json!({ "type": "telemetry" })).await?;
    if !matches!(stray, EventOutcome::Ignored) {
        bail!("unrelated message type was not ignored");
    }
    Ok(())
}

/// The three push payload tiers plus the payload-less case.
async fn push_payload_tiers(h: &Harness) -> anyhow::Result<()> {
    let runtime = h.runtime().await?;

    let json_payload = serde_json::to_vec(&json!({
        "title": "ข่าวด่วน",
        "body": "payload แบบ JSON",
        "tag": "news",
    }))?;
    runtime.dispatch(WorkerEvent::Push(Some(json_payload))).await?;
    let shown = h.displayed_tag("news").await?;
    if shown.title != "ข่าวด่วน" {
        bail!("structured push lost its title");
    }

    runtime
        .dispatch(WorkerEvent::Push(Some(b"plain text ping".to_vec())))
        .await?;
    let shown = h.displayed_tag(swkit_notify::PUSH_TAG).await?;
    if shown.options.body.as_deref() != Some("plain text ping") {
        bail!("text push body mismatch: {:?}", shown.options.body);
    }

    runtime.dispatch(WorkerEvent::Push(None)).await?;
    let shown = h.displayed_tag(swkit_notify::PUSH_TAG).await?;
    if shown.title != swkit_notify::PUSH_FALLBACK_TITLE {
        bail!("empty push did not fall back to default title");
    }
    Ok(())
}

/// Navigation while the origin is unreachable falls back to the cached shell.
async fn offline_navigation_fallback(h: &Harness) -> anyhow::Result<()> {
    let runtime = h.runtime().await?;
    h.origin.set_offline(true);

    let url = Url::parse(&format!("{}/deep/link", ORIGIN))?;
    let outcome = runtime
        .dispatch(WorkerEvent::Fetch(FetchRequest::navigation(url)))
        .await;
    h.origin.set_offline(false);

    match outcome? {
        EventOutcome::Fetch(FetchDecision::Respond(response)) => {
            if !response.from_cache {
                bail!("offline navigation served from network?");
            }
            if response.body != INDEX_BODY {
                bail!("offline fallback is not the cached app shell");
            }
            Ok(())
        }
        other => bail!("unexpected fetch outcome: {:?}", other),
    }
}

/// A click with no open windows opens exactly one at the scope root.
async fn click_opens_window(h: &Harness) -> anyhow::Result<()> {
    let runtime = h.runtime().await?;
    runtime
        .dispatch(WorkerEvent::NotificationClick(NotificationClickEvent::new(
            Some("persistent".to_string()),
            Some(json!({ "url": "/" })),
        )))
        .await?;

    let ctx = runtime.context();
    let clients = ctx.clients.read().await;
    if clients.len() != 1 {
        bail!("expected exactly one opened window, found {}", clients.len());
    }
    let center = ctx.notifications.read().await;
    if center.get_by_tag("persistent").is_some() {
        bail!("clicked notification was not dismissed");
    }
    Ok(())
}

/// Action buttons route through the per-action URL map and reuse the window.
async fn actionable_click_routes(h: &Harness) -> anyhow::Result<()> {
    let options = NotificationOptions {
        body: Some("เลือก Open เพื่อโฟกัสแอป หรือ Snooze เพื่อปิดชั่วคราว".to_string()),
        tag: Some("actionable".to_string()),
        require_interaction: Some(true),
        actions: Some(vec![
            NotificationAction {
                action: "open-app".to_string(),
                title: "Open".to_string(),
                icon: None,
            },
            NotificationAction {
                action: "snooze".to_string(),
                title: "Snooze".to_string(),
                icon: None,
            },
        ]),
        data: Some(json!({
            "url": "/",
            "actions": { "open-app": "/?notification=open" },
        })),
        ..NotificationOptions::default()
    };
    h.container.show_notification("แจ้งเตือนพร้อมปุ่ม", options).await?;

    let runtime = h.runtime().await?;
    let click = NotificationClickEvent::new(
        Some("actionable".to_string()),
        Some(json!({
            "url": "/",
            "actions": { "open-app": "/?notification=open" },
        })),
    )
    .with_action("open-app");
    runtime
        .dispatch(WorkerEvent::NotificationClick(click))
        .await?;

    let ctx = runtime.context();
    let clients = ctx.clients.read().await;
    if clients.len() != 1 {
        bail!("click should focus the existing window, found {}", clients.len());
    }
    let window = clients
        .match_all(&Default::default())
        .into_iter()
        .next()
        .context("no window after actionable click")?;
    if window.url.query() != Some("notification=open") {
        bail!("window did not navigate to the action target: {}", window.url);
    }
    if !window.focused {
        bail!("routed window was not focused");
    }
    Ok(())
}

// ==================== Entry Point ====================

async fn run_all() -> anyhow::Result<Vec<ScenarioOutcome>> {
    let harness = Harness::boot().await?;

    type Step<'a> = (
        &'static str,
        std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>>,
    );
    let steps: Vec<Step<'_>> = vec![
        ("immediate-notification", Box::pin(immediate_notification(&harness))),
        ("notification-with-image", Box::pin(notification_with_image(&harness))),
        ("persistent-notification", Box::pin(persistent_notification(&harness))),
        ("badge-and-vibration", Box::pin(badge_and_vibration(&harness))),
        ("scheduled-message", Box::pin(scheduled_message(&harness))),
        ("push-payload-tiers", Box::pin(push_payload_tiers(&harness))),
        ("offline-navigation-fallback", Box::pin(offline_navigation_fallback(&harness))),
        ("click-opens-window", Box::pin(click_opens_window(&harness))),
        ("actionable-click-routes", Box::pin(actionable_click_routes(&harness))),
    ];

    let mut outcomes = Vec::with_capacity(steps.len());
    for (name, step) in steps {
        let result = step.await;
        match &result {
            Ok(()) => info!(scenario = name, "ok"),
            Err(err) => error!(scenario = name, error = %err, "failed"),
        }
        outcomes.push(ScenarioOutcome {
            name,
            passed: result.is_ok(),
            detail: result.err().map(|e| format!("{e:#}")).unwrap_or_default(),
        });
    }
    Ok(outcomes)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LogConfig::default());

    let outcomes = run_all().await?;
    let failed = outcomes.iter().filter(|o| !o.passed).count();

    let summary = json!({
        "scenarios": outcomes
            .iter()
            .map(|o| json!({ "name": o.name, "passed": o.passed, "detail": o.detail }))
            .collect::<Vec<_>>(),
        "passed": outcomes.len() - failed,
        "failed": failed,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
