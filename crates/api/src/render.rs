use crate::models::{ComponentType, RouteParameters};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One view extension instance as handed to the renderer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtensionView {
    pub component: ComponentType,
    pub context: Option<serde_json::Value>,
    pub attributes: IndexMap<String, serde_json::Value>,
}

/// What a router or placeholder asks the UI framework to display.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedView {
    Page {
        page_type: ComponentType,
        parameters: RouteParameters,
    },
    Fallback {
        component: ComponentType,
        path: String,
    },
    NotFound {
        path: String,
    },
    Extensions {
        items: Vec<ExtensionView>,
    },
}

impl RenderedView {
    /// The component types this view keeps alive in the render tree.
    pub fn referenced_types(&self) -> Vec<&ComponentType> {
        match self {
            RenderedView::Page { page_type, .. } => vec![page_type],
            RenderedView::Fallback { component, .. } => vec![component],
            RenderedView::NotFound { .. } => Vec::new(),
            RenderedView::Extensions { items } => items.iter().map(|i| &i.component).collect(),
        }
    }
}

/// The render handle side of the UI framework.
pub trait RenderTarget: Send + Sync {
    fn render(&self, view: RenderedView);
}
