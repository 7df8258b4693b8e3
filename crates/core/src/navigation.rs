//! Navigation manager that keeps the location in memory.
//!
//! Stands in for the browser: external navigations and intercepted link
//! clicks notify listeners, forced loads are only recorded.

use async_trait::async_trait;
use modula_api::{ListenerId, LocationChanged, LocationListener, NavigationManager};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

pub struct InMemoryNavigation {
    base_uri: String,
    location: RwLock<String>,
    reloads: RwLock<Vec<String>>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn LocationListener>)>>,
    next_listener: AtomicU64,
}

impl InMemoryNavigation {
    pub fn new(base_uri: &str) -> Self {
        let base_uri = if base_uri.ends_with('/') {
            base_uri.to_string()
        } else {
            format!("{base_uri}/")
        };
        Self {
            location: RwLock::new(base_uri.clone()),
            base_uri,
            reloads: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Starts at `location` (relative to the base or absolute) without notifying.
    pub fn with_location(self, location: &str) -> Self {
        *self.location.write() = self.resolve(location);
        self
    }

    /// Resolves `uri` against the base URI.
    pub fn resolve(&self, uri: &str) -> String {
        if let Ok(absolute) = Url::parse(uri) {
            return absolute.to_string();
        }
        match Url::parse(&self.base_uri).and_then(|base| base.join(uri.trim_start_matches('/'))) {
            Ok(joined) => joined.to_string(),
            Err(_) => format!("{}{}", self.base_uri, uri.trim_start_matches('/')),
        }
    }

    /// Locations that were loaded with `force_load`, oldest first.
    pub fn reloads(&self) -> Vec<String> {
        self.reloads.read().clone()
    }

    /// Navigation caused by the router's own link interception.
    pub async fn click_link(&self, uri: &str) {
        self.change_location(uri, true).await;
    }

    async fn change_location(&self, uri: &str, intercepted: bool) {
        let location = self.resolve(uri);
        *self.location.write() = location.clone();

        let event = LocationChanged {
            location,
            is_navigation_intercepted: intercepted,
        };
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener.location_changed(&event).await;
        }
    }
}

#[async_trait]
impl NavigationManager for InMemoryNavigation {
    fn base_uri(&self) -> String {
        self.base_uri.clone()
    }

    fn absolute_uri(&self) -> String {
        self.location.read().clone()
    }

    fn add_location_listener(&self, listener: Arc<dyn LocationListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    fn remove_location_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    async fn navigate_to(&self, uri: &str, force_load: bool) {
        if force_load {
            let location = self.resolve(uri);
            tracing::debug!("Full page load of {}", location);
            *self.location.write() = location.clone();
            self.reloads.write().push(location);
            return;
        }
        self.change_location(uri, false).await;
    }
}
