//! In-process stand-in for the platform notification UI.
//!
//! Displayed notifications are kept in presentation order. Showing a
//! descriptor whose tag matches an already-displayed notification
//! replaces it in place (tag-based replace; `renotify` only controls
//! re-alerting, not whether replacement happens).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use swkit_notify::NotificationDescriptor;
use tracing::info;

/// Unique identifier for a displayed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(u64);

impl NotificationId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A notification currently on screen.
#[derive(Debug, Clone)]
pub struct DisplayedNotification {
    /// Display ID; a replacement gets a fresh one.
    pub id: NotificationId,

    /// What is being displayed.
    pub descriptor: NotificationDescriptor,

    /// When it was (last) shown.
    pub shown_at: Instant,
}

/// Registry of displayed notifications.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    displayed: Vec<DisplayedNotification>,
}

impl NotificationCenter {
    /// Create an empty center.
    pub fn new() -> Self {
        Self::default()
    }

    /// Present a notification. Same-tag notifications replace each other
    /// in place; untagged ones stack.
    pub fn show(&mut self, descriptor: NotificationDescriptor) -> NotificationId {
        let id = NotificationId::new();
        info!(title = %descriptor.title, tag = descriptor.tag().unwrap_or("-"), "showing notification");

        let shown = DisplayedNotification {
            id,
            descriptor,
            shown_at: Instant::now(),
        };

        let replaced = shown
            .descriptor
            .tag()
            .and_then(|tag| self.position_by_tag(tag));
        match replaced {
            Some(index) => self.displayed[index] = shown,
            None => self.displayed.push(shown),
        }
        id
    }

    /// Dismiss by display ID.
    pub fn close(&mut self, id: NotificationId) -> bool {
        let index = self.displayed.iter().position(|n| n.id == id);
        match index {
            Some(i) => {
                self.displayed.remove(i);
                true
            }
            None => false,
        }
    }

    /// Dismiss the notification carrying a tag.
    pub fn close_by_tag(&mut self, tag: &str) -> bool {
        match self.position_by_tag(tag) {
            Some(i) => {
                self.displayed.remove(i);
                true
            }
            None => false,
        }
    }

    /// Find a displayed notification by tag.
    pub fn get_by_tag(&self, tag: &str) -> Option<&DisplayedNotification> {
        self.position_by_tag(tag).map(|i| &self.displayed[i])
    }

    /// All displayed notifications, in presentation order.
    pub fn displayed(&self) -> &[DisplayedNotification] {
        &self.displayed
    }

    /// Number of notifications on screen.
    pub fn len(&self) -> usize {
        self.displayed.len()
    }

    /// Check if nothing is displayed.
    pub fn is_empty(&self) -> bool {
        self.displayed.is_empty()
    }

    fn position_by_tag(&self, tag: &str) -> Option<usize> {
        self.displayed
            .iter()
            .position(|n| n.descriptor.tag() == Some(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swkit_notify::NotificationOptions;

    fn descriptor(title: &str, tag: Option<&str>) -> NotificationDescriptor {
        NotificationDescriptor::new(
            title,
            NotificationOptions {
                tag: tag.map(str::to_string),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_show_and_close() {
        let mut center = NotificationCenter::new();
        let id = center.show(descriptor("hello", Some("greeting")));

        assert_eq!(center.len(), 1);
        assert!(center.close(id));
        assert!(center.is_empty());
        assert!(!center.close(id));
    }

    #[test]
    fn test_same_tag_replaces_with_fresh_id() {
        let mut center = NotificationCenter::new();
        let first = center.show(descriptor("old", Some("persistent")));
        let second = center.show(descriptor("new", Some("persistent")));

        assert_ne!(first, second);
        assert_eq!(center.len(), 1);
        assert_eq!(center.get_by_tag("persistent").unwrap().descriptor.title, "new");
    }

    #[test]
    fn test_untagged_notifications_stack() {
        let mut center = NotificationCenter::new();
        center.show(descriptor("one", None));
        center.show(descriptor("two", None));

        assert_eq!(center.len(), 2);
    }

    #[test]
    fn test_close_by_tag() {
        let mut center = NotificationCenter::new();
        center.show(descriptor("keep", Some("a")));
        center.show(descriptor("drop", Some("b")));

        assert!(center.close_by_tag("b"));
        assert!(!center.close_by_tag("b"));
        assert_eq!(center.len(), 1);
        assert!(center.get_by_tag("a").is_some());
    }
}
