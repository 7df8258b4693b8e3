//! Renders every discovered implementation of a view-extension definition.

use crate::assembly::{AssemblyChange, AssemblySnapshot, AssemblySource, ComponentResolver};
use crate::error::{Result, RouterError};
use crate::reactive::{AssemblyObserver, DerivedState, Subscription};
use async_trait::async_trait;
use indexmap::IndexMap;
use modula_api::{Capability, ComponentType, ExtensionView, RenderTarget, RenderedView};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PlaceholderParameters {
    /// Passed to every extension as its `Context` parameter.
    pub context: Option<Value>,
    /// Extra attributes applied to every extension.
    pub attributes: IndexMap<String, Value>,
}

struct PlaceholderState {
    target: Option<Arc<dyn RenderTarget>>,
    parameters: PlaceholderParameters,
    extensions: DerivedState<BTreeSet<ComponentType>>,
}

pub struct ViewExtensionPlaceholder {
    definition: Capability,
    source: Arc<AssemblySource>,
    resolver: Arc<ComponentResolver>,
    state: tokio::sync::Mutex<PlaceholderState>,
    subscription: parking_lot::Mutex<Option<Subscription>>,
}

impl ViewExtensionPlaceholder {
    pub fn new(
        definition: Capability,
        source: Arc<AssemblySource>,
        resolver: Arc<ComponentResolver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            definition,
            source,
            resolver,
            state: tokio::sync::Mutex::new(PlaceholderState {
                target: None,
                parameters: PlaceholderParameters::default(),
                extensions: DerivedState::new(),
            }),
            subscription: parking_lot::Mutex::new(None),
        })
    }

    pub fn definition(&self) -> &Capability {
        &self.definition
    }

    pub async fn attach(&self, target: Arc<dyn RenderTarget>) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.target.is_some() {
            return Err(RouterError::AlreadyAttached.into());
        }
        state.target = Some(target);
        Ok(())
    }

    /// Applies parameters and renders; subscribes to assembly changes on first use.
    pub async fn set_parameters(self: &Arc<Self>, parameters: PlaceholderParameters) -> Result<()> {
        let mut state = self.state.lock().await;
        let target = state.target.clone().ok_or(RouterError::NotAttached)?;
        {
            let mut subscription = self.subscription.lock();
            if subscription.is_none() {
                *subscription = Some(Subscription::to_assemblies(&self.source, Arc::downgrade(self)));
            }
        }

        state.parameters = parameters;
        let extensions = self.resolve(&self.source.snapshot());
        state.extensions.update_if_changed(extensions);
        Self::render(&state, target.as_ref());
        Ok(())
    }

    /// Extension types currently displayed, ordered by assembly then name.
    pub async fn extensions(&self) -> Vec<ComponentType> {
        self.state
            .lock()
            .await
            .extensions
            .get()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn dispose(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.cancel();
        }
    }

    fn resolve(&self, snapshot: &AssemblySnapshot) -> BTreeSet<ComponentType> {
        snapshot
            .assemblies()
            .iter()
            .flat_map(|assembly| {
                self.resolver
                    .view_extensions(assembly, &self.definition)
                    .as_ref()
                    .clone()
            })
            .collect()
    }

    fn render(state: &PlaceholderState, target: &dyn RenderTarget) {
        let items = state
            .extensions
            .get()
            .map(|set| {
                set.iter()
                    .map(|component| ExtensionView {
                        component: component.clone(),
                        context: state.parameters.context.clone(),
                        attributes: state.parameters.attributes.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        target.render(RenderedView::Extensions { items });
    }
}

#[async_trait]
impl AssemblyObserver for ViewExtensionPlaceholder {
    async fn on_assemblies_changed(&self, change: &AssemblyChange) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(target) = state.target.clone() else {
            return Ok(());
        };
        let extensions = self.resolve(&change.snapshot);
        if state.extensions.update_if_changed(extensions) {
            tracing::debug!(
                "View extensions of {} changed after {:?}",
                self.definition,
                change.kind
            );
            Self::render(&state, target.as_ref());
        }
        Ok(())
    }
}
