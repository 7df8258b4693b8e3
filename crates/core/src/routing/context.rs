use modula_api::{ComponentType, RouteParameters};
use percent_encoding::percent_decode_str;

/// A single match attempt against a route table.
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    pub segments: Vec<String>,
    pub handler: Option<ComponentType>,
    pub parameters: RouteParameters,
}

impl RouteContext {
    /// Splits a base-relative path (without query or fragment) into
    /// percent-decoded segments. Empty segments are dropped.
    pub fn new(path: &str) -> Self {
        let segments = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();

        Self {
            segments,
            handler: None,
            parameters: RouteParameters::new(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.handler.is_some()
    }
}
