use crate::models::ListenerId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Raised after the current location changed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LocationChanged {
    /// The new absolute URI.
    pub location: String,
    /// True if the navigation originated from the router's own link
    /// interception, false if it was driven externally (history, script,
    /// initial load).
    pub is_navigation_intercepted: bool,
}

#[async_trait]
pub trait LocationListener: Send + Sync {
    async fn location_changed(&self, event: &LocationChanged);
}

#[async_trait]
pub trait NavigationManager: Send + Sync {
    /// Base URI of the application, always ending with `/`.
    fn base_uri(&self) -> String;

    fn absolute_uri(&self) -> String;

    fn add_location_listener(&self, listener: Arc<dyn LocationListener>) -> ListenerId;

    fn remove_location_listener(&self, id: ListenerId) -> bool;

    /// Navigates to `uri`. With `force_load` the host performs a full
    /// (non-incremental) load and no listener sees the change.
    async fn navigate_to(&self, uri: &str, force_load: bool);

    /// Converts an absolute URI into a path relative to the base URI.
    ///
    /// A URI equal to the base without its trailing slash maps to the empty
    /// path; a URI outside the base is returned unchanged.
    fn to_base_relative_path(&self, absolute: &str) -> String {
        let base = self.base_uri();
        if let Some(rest) = absolute.strip_prefix(base.as_str()) {
            return rest.to_string();
        }
        if absolute == base.trim_end_matches('/') {
            return String::new();
        }
        absolute.to_string()
    }
}
