use super::message::{Clock, NotificationId, NotificationMessage, NotificationType, SystemClock, UriFilter};
use crate::error::NotificationError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Receipt for a placed notification, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationPlacement {
    pub id: NotificationId,
}

/// Anything notifications can be placed with.
pub trait NotificationSink: Send + Sync {
    fn place(&self, message: NotificationMessage)
    -> Result<NotificationPlacement, NotificationError>;

    /// Cancels a placement made through this sink; unknown placements are ignored.
    fn cancel(&self, placement: &NotificationPlacement) -> Result<(), NotificationError>;
}

/// A live notification as seen by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub notification_type: NotificationType,
    pub message: String,
    pub description: Option<String>,
    pub target_uri: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub allow_dismiss: bool,
    pub uri_filter: UriFilter,
    pub key: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }
}

struct ManagerState {
    disposed: bool,
    live: Vec<Notification>,
}

/// Root of a notification hierarchy; owns the ordered list of live notifications.
pub struct NotificationManager {
    clock: Arc<dyn Clock>,
    state: Mutex<ManagerState>,
    changes: watch::Sender<u64>,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl NotificationManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            clock,
            state: Mutex::new(ManagerState {
                disposed: false,
                live: Vec::new(),
            }),
            changes,
        }
    }

    /// Receives a new version number after every change of the live list.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Live notifications, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.prune_expired();
        self.state.lock().live.clone()
    }

    /// Live notifications whose filter admits `path` (base-relative).
    pub fn notifications_for(&self, path: &str) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.uri_filter.is_match(path))
            .collect()
    }

    /// Dismisses a notification on behalf of the user. Only notifications
    /// placed with `allow_dismiss` can be dismissed.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let removed = {
            let mut state = self.state.lock();
            match state.live.iter().position(|n| n.id == id && n.allow_dismiss) {
                Some(index) => {
                    state.live.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.bump();
        }
        removed
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Drops every notification; later placements fail with `Disposed`.
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.live.clear();
        }
        self.bump();
    }

    fn prune_expired(&self) {
        let now = self.clock.now();
        let pruned = {
            let mut state = self.state.lock();
            let before = state.live.len();
            state.live.retain(|n| !n.is_expired(now));
            before != state.live.len()
        };
        if pruned {
            tracing::trace!("Pruned expired notifications");
            self.bump();
        }
    }

    fn bump(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

impl NotificationSink for NotificationManager {
    fn place(
        &self,
        message: NotificationMessage,
    ) -> Result<NotificationPlacement, NotificationError> {
        if message.message.trim().is_empty() {
            return Err(NotificationError::InvalidArgument(
                "notification message must not be empty".to_string(),
            ));
        }

        let notification = Notification {
            id: NotificationId::next(),
            notification_type: message.notification_type,
            message: message.message,
            description: message.description,
            target_uri: message.target_uri,
            expiration: message.expiration,
            allow_dismiss: message.allow_dismiss,
            uri_filter: message.uri_filter,
            key: message.key,
            timestamp: message.timestamp.unwrap_or_else(|| self.clock.now()),
        };
        let placement = NotificationPlacement {
            id: notification.id,
        };

        {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(NotificationError::Disposed);
            }
            if let Some(key) = &notification.key {
                state.live.retain(|n| n.key.as_ref() != Some(key));
            }
            state.live.push(notification);
        }

        self.bump();
        Ok(placement)
    }

    fn cancel(&self, placement: &NotificationPlacement) -> Result<(), NotificationError> {
        let removed = {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(NotificationError::Disposed);
            }
            let before = state.live.len();
            state.live.retain(|n| n.id != placement.id);
            before != state.live.len()
        };
        if removed {
            self.bump();
        }
        Ok(())
    }
}
