//! Window client registry: the open page contexts a worker can focus,
//! navigate, claim, or open.
//!
//! Clients are kept in creation order; the click router handles the
//! first enumerated window and stops.

use std::sync::atomic::{AtomicU64, Ordering};
use swkit_common::{Result, SwError};
use tracing::debug;
use url::Url;

/// Client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientType {
    /// A top-level page.
    #[default]
    Window,
    /// A worker context.
    Worker,
    /// Any type.
    All,
}

/// An open page context.
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Current URL.
    pub url: Url,

    /// Client type.
    pub client_type: ClientType,

    /// Whether this worker version controls the client.
    pub controlled: bool,

    /// Whether in foreground focus.
    pub focused: bool,
}

impl Client {
    fn next_id() -> String {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        format!("client-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a window client at a URL.
    pub fn window(url: Url) -> Self {
        Self {
            id: Self::next_id(),
            url,
            client_type: ClientType::Window,
            controlled: false,
            focused: false,
        }
    }

    /// Bring this client to foreground focus.
    pub fn focus(&mut self) -> Result<()> {
        if self.client_type != ClientType::Window {
            return Err(SwError::invalid_state("can only focus window clients"));
        }
        self.focused = true;
        Ok(())
    }

    /// Navigate this client to a target, resolved against its current URL.
    pub fn navigate(&mut self, target: &str) -> Result<()> {
        if self.client_type != ClientType::Window {
            return Err(SwError::invalid_state("can only navigate window clients"));
        }
        let resolved = self
            .url
            .join(target)
            .map_err(|e| SwError::navigation_with_source(format!("invalid target {target:?}"), e))?;
        debug!(client = %self.id, url = %resolved, "client navigated");
        self.url = resolved;
        Ok(())
    }
}

/// Options for [`Clients::match_all`].
#[derive(Debug, Clone, Default)]
pub struct ClientMatchOptions {
    /// Include clients not controlled by this worker version.
    pub include_uncontrolled: bool,

    /// Client type filter.
    pub client_type: ClientType,
}

impl ClientMatchOptions {
    /// The click router's query: windows, controlled or not.
    pub fn windows_including_uncontrolled() -> Self {
        Self {
            include_uncontrolled: true,
            client_type: ClientType::Window,
        }
    }
}

/// The set of open page contexts.
#[derive(Debug, Default)]
pub struct Clients {
    clients: Vec<Client>,
}

impl Clients {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    /// Match clients in enumeration (creation) order.
    pub fn match_all(&self, options: &ClientMatchOptions) -> Vec<&Client> {
        self.clients
            .iter()
            .filter(|c| match options.client_type {
                ClientType::All => true,
                t => c.client_type == t,
            })
            .filter(|c| options.include_uncontrolled || c.controlled)
            .collect()
    }

    /// The first matching window, mutably. The click router takes this
    /// one and stops, whatever the outcome of focus/navigate.
    pub fn first_window_mut(&mut self, options: &ClientMatchOptions) -> Option<&mut Client> {
        self.clients
            .iter_mut()
            .filter(|c| c.client_type == ClientType::Window)
            .find(|c| options.include_uncontrolled || c.controlled)
    }

    /// Open a new window at a URL. The new window is focused and, being
    /// created under this worker, controlled.
    pub fn open_window(&mut self, url: Url) -> &Client {
        let mut client = Client::window(url);
        client.focused = true;
        client.controlled = true;
        debug!(client = %client.id, url = %client.url, "opened window");
        self.clients.push(client);
        // Just pushed, so the last element is the new window.
        &self.clients[self.clients.len() - 1]
    }

    /// Take control of every open client without waiting for reloads.
    pub fn claim(&mut self) {
        for client in &mut self.clients {
            client.controlled = true;
        }
        debug!(count = self.clients.len(), "claimed clients");
    }

    /// Add a pre-existing client (a page opened before this worker).
    pub fn add(&mut self, client: Client) {
        self.clients.push(client);
    }

    /// Remove a client (page closed).
    pub fn remove(&mut self, id: &str) -> Option<Client> {
        let index = self.clients.iter().position(|c| c.id == id)?;
        Some(self.clients.remove(index))
    }

    /// Number of open clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Check if no clients are open.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_focus_and_navigate() {
        let mut client = Client::window(url("https://app.example/"));
        assert!(!client.focused);

        client.focus().unwrap();
        assert!(client.focused);

        client.navigate("/?notification=open").unwrap();
        assert_eq!(client.url.as_str(), "https://app.example/?notification=open");
    }

    #[test]
    fn test_match_all_respects_controlled_filter() {
        let mut clients = Clients::new();
        clients.add(Client::window(url("https://app.example/")));

        let controlled_only = ClientMatchOptions::default();
        assert!(clients.match_all(&controlled_only).is_empty());

        let all = ClientMatchOptions::windows_including_uncontrolled();
        assert_eq!(clients.match_all(&all).len(), 1);

        clients.claim();
        assert_eq!(clients.match_all(&controlled_only).len(), 1);
    }

    #[test]
    fn test_first_window_is_enumeration_order() {
        let mut clients = Clients::new();
        clients.add(Client::window(url("https://app.example/first")));
        clients.add(Client::window(url("https://app.example/second")));

        let options = ClientMatchOptions::windows_including_uncontrolled();
        let first = clients.first_window_mut(&options).unwrap();
        assert_eq!(first.url.path(), "/first");
    }

    #[test]
    fn test_open_window_is_focused_and_controlled() {
        let mut clients = Clients::new();
        let opened = clients.open_window(url("https://app.example/?notification=open"));
        assert!(opened.focused);
        assert!(opened.controlled);
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut clients = Clients::new();
        clients.add(Client::window(url("https://app.example/")));
        let id = clients.match_all(&ClientMatchOptions::windows_including_uncontrolled())[0]
            .id
            .clone();

        assert!(clients.remove(&id).is_some());
        assert!(clients.is_empty());
        assert!(clients.remove(&id).is_none());
    }
}
