//! Fetch interception policy.
//!
//! GET requests only. Navigations are network-first with an offline
//! fallback chain (exact cached entry, then the cached root document,
//! then a synthesized error response); same-origin subresources are
//! cache-first; cross-origin requests pass through untouched.

use crate::events::{FetchDecision, FetchRequest, FetchResponse};
use crate::NetworkFetch;
use std::sync::Arc;
use swkit_cache::{CacheKey, CacheStorage};
use tokio::sync::RwLock;
use tracing::{debug, trace};
use url::Url;

/// Apply the interception policy to one request.
pub(crate) async fn intercept(
    caches: &Arc<RwLock<CacheStorage>>,
    network: &dyn NetworkFetch,
    version: &str,
    origin: &Url,
    request: &FetchRequest,
) -> FetchDecision {
    if !request.is_get() {
        trace!(method = %request.method, url = %request.url, "non-GET, passing through");
        return FetchDecision::Passthrough;
    }

    if request.is_navigation {
        return FetchDecision::Respond(navigate(caches, network, version, origin, request).await);
    }

    if request.url.origin() != origin.origin() {
        trace!(url = %request.url, "cross-origin, passing through");
        return FetchDecision::Passthrough;
    }

    FetchDecision::Respond(subresource(caches, network, version, request).await)
}

/// Network-first: fresh shell when online, cached shell offline.
async fn navigate(
    caches: &Arc<RwLock<CacheStorage>>,
    network: &dyn NetworkFetch,
    version: &str,
    origin: &Url,
    request: &FetchRequest,
) -> FetchResponse {
    match network.fetch(request) {
        Ok(response) => {
            caches
                .write()
                .await
                .open(version)
                .put(response.to_entry(&request.url));
            debug!(url = %request.url, status = response.status, "navigation served from network");
            response
        }
        Err(error) => {
            debug!(url = %request.url, %error, "navigation network failure, trying cache");
            let caches = caches.read().await;
            let store = match caches.get(version) {
                Ok(store) => store,
                Err(_) => return FetchResponse::network_error(),
            };

            if let Some(entry) = store.match_url(request.url.as_str()) {
                return FetchResponse::from_entry(entry);
            }

            // Fall back to the cached root document; failing that, the
            // requester gets a synthesized error, never a thrown one.
            let root = root_url(origin);
            store
                .match_url(root.as_str())
                .map(FetchResponse::from_entry)
                .unwrap_or_else(FetchResponse::network_error)
        }
    }
}

/// Cache-first: static assets rarely change within a version.
async fn subresource(
    caches: &Arc<RwLock<CacheStorage>>,
    network: &dyn NetworkFetch,
    version: &str,
    request: &FetchRequest,
) -> FetchResponse {
    let key = CacheKey::new(&request.method, request.url.as_str());
    {
        let caches = caches.read().await;
        if let Some(entry) = caches.get(version).ok().and_then(|s| s.match_request(&key)) {
            trace!(url = %request.url, "subresource served from cache");
            return FetchResponse::from_entry(entry);
        }
    }

    match network.fetch(request) {
        Ok(response) => {
            caches
                .write()
                .await
                .open(version)
                .put(response.to_entry(&request.url));
            debug!(url = %request.url, status = response.status, "subresource cached from network");
            response
        }
        Err(error) => {
            debug!(url = %request.url, %error, "subresource unavailable");
            FetchResponse::network_error()
        }
    }
}

fn root_url(origin: &Url) -> Url {
    // Joining "/" onto an absolute URL cannot fail.
    origin.join("/").unwrap_or_else(|_| origin.clone())
}
