//! Notification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification addressed to the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

/// Snapshot of the user's notifications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationSummary {
    pub items: Vec<Notification>,
    pub unread_count: usize,
}

impl NotificationSummary {
    pub fn new(items: Vec<Notification>) -> Self {
        let unread_count = items.iter().filter(|n| !n.is_read).count();
        Self {
            items,
            unread_count,
        }
    }

    /// Most recently created unread item
    pub fn newest_unread(&self) -> Option<&Notification> {
        self.items
            .iter()
            .filter(|n| !n.is_read)
            .max_by_key(|n| (n.created_at, n.id))
    }

    /// Mark one item read locally. Returns false when the id is unknown.
    pub fn mark_read(&mut self, id: i64) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(item) => {
                if !item.is_read {
                    item.is_read = true;
                    self.unread_count = self.unread_count.saturating_sub(1);
                }
                true
            }
            None => false,
        }
    }
}

/// Signals raised by the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// Unread count went up; carries the newest unread item
    New(Notification),
}
