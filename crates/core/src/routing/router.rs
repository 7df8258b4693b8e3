//! The route-rendering component.
//!
//! A [`Router`] is attached to a render target, builds its [`RouteTable`]
//! from a [`RoutableComponents`] source when parameters are first set, and
//! re-evaluates the current location on every navigation. Assembly-aware
//! invalidation lives in [`super::ModularRouter`], which drives the router
//! through [`RouterGuard`].

use super::LiteralComparison;
use super::context::RouteContext;
use super::table::RouteTable;
use crate::error::{Result, RouteError, RouterError};
use crate::reactive::{DerivedState, LocationObserver, Subscription};
use async_trait::async_trait;
use modula_api::{
    Capability, ComponentType, LocationChanged, NavigationManager, RenderTarget, RenderedView,
    RouteParameters,
};
use std::sync::Arc;

/// Supplies the component types a router may route to.
pub trait RoutableComponents: Send + Sync {
    fn resolve_routable_components(&self) -> Vec<ComponentType>;
}

/// A fixed set of routable components.
#[derive(Debug, Clone, Default)]
pub struct StaticRoutes(pub Vec<ComponentType>);

impl RoutableComponents for StaticRoutes {
    fn resolve_routable_components(&self) -> Vec<ComponentType> {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouterParameters {
    /// Rendered when no route matches.
    pub fallback: Option<ComponentType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterPhase {
    Uninitialized,
    /// The route table is built but no location was evaluated yet.
    Initialized,
    Routed { matched: bool },
}

/// Handler and parameters of a rendered route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteData {
    pub page_type: ComponentType,
    pub parameters: RouteParameters,
}

/// What a refresh left for the caller to do once the router lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RefreshOutcome {
    Rendered,
    /// Nothing matched an intercepted navigation; reload the location.
    Redirect(String),
}

struct RouterState {
    phase: RouterPhase,
    target: Option<Arc<dyn RenderTarget>>,
    base_uri: String,
    location: String,
    intercepted: bool,
    fallback: Option<ComponentType>,
    routes: DerivedState<Arc<RouteTable>>,
    current: Option<RouteData>,
    previous: Option<RouteData>,
    refreshes: u64,
}

pub struct Router {
    navigation: Arc<dyn NavigationManager>,
    components: Arc<dyn RoutableComponents>,
    comparison: LiteralComparison,
    state: tokio::sync::Mutex<RouterState>,
    location_subscription: parking_lot::Mutex<Option<Subscription>>,
}

impl Router {
    pub fn new(
        navigation: Arc<dyn NavigationManager>,
        components: Arc<dyn RoutableComponents>,
        comparison: LiteralComparison,
    ) -> Arc<Self> {
        Arc::new(Self {
            navigation,
            components,
            comparison,
            state: tokio::sync::Mutex::new(RouterState {
                phase: RouterPhase::Uninitialized,
                target: None,
                base_uri: String::new(),
                location: String::new(),
                intercepted: false,
                fallback: None,
                routes: DerivedState::new(),
                current: None,
                previous: None,
                refreshes: 0,
            }),
            location_subscription: parking_lot::Mutex::new(None),
        })
    }

    pub fn navigation(&self) -> &Arc<dyn NavigationManager> {
        &self.navigation
    }

    /// Binds the router to its render target and starts following the location.
    pub async fn attach(self: &Arc<Self>, target: Arc<dyn RenderTarget>) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.target.is_some() {
            return Err(RouterError::AlreadyAttached.into());
        }

        state.target = Some(target);
        state.base_uri = self.navigation.base_uri();
        state.location = self.navigation.absolute_uri();
        drop(state);

        let subscription = Subscription::to_locations(&self.navigation, Arc::downgrade(self));
        *self.location_subscription.lock() = Some(subscription);
        Ok(())
    }

    /// Applies parameters, rebuilds the route table and renders the current location.
    pub async fn set_parameters(&self, parameters: RouterParameters) -> Result<()> {
        let mut guard = self.lock().await;
        if guard.state.target.is_none() {
            return Err(RouterError::NotAttached.into());
        }

        guard.state.fallback = parameters.fallback;
        let types = self.components.resolve_routable_components();
        guard.rebuild(types)?;
        let outcome = guard.refresh()?;
        drop(guard);

        self.complete(outcome).await;
        Ok(())
    }

    /// Re-evaluates the current location against the installed table.
    pub async fn refresh(&self) -> Result<()> {
        let mut guard = self.lock().await;
        let outcome = guard.refresh()?;
        drop(guard);
        self.complete(outcome).await;
        Ok(())
    }

    /// Rebuilds the table from the component source, then refreshes.
    pub async fn rebuild_routes(&self) -> Result<()> {
        let mut guard = self.lock().await;
        if !guard.is_initialized() {
            return Err(RouterError::NotInitialized.into());
        }
        guard.rebuild(self.components.resolve_routable_components())?;
        let outcome = guard.refresh()?;
        drop(guard);
        self.complete(outcome).await;
        Ok(())
    }

    pub async fn base_uri(&self) -> String {
        self.state.lock().await.base_uri.clone()
    }

    /// The absolute location the router last evaluated or was told about.
    pub async fn location(&self) -> String {
        self.state.lock().await.location.clone()
    }

    pub async fn phase(&self) -> RouterPhase {
        self.state.lock().await.phase
    }

    pub async fn current_route(&self) -> Option<RouteData> {
        self.state.lock().await.current.clone()
    }

    pub async fn previous_route(&self) -> Option<RouteData> {
        self.state.lock().await.previous.clone()
    }

    pub async fn route_table(&self) -> Option<Arc<RouteTable>> {
        self.state.lock().await.routes.get().cloned()
    }

    /// Number of route evaluations performed so far.
    pub async fn refresh_count(&self) -> u64 {
        self.state.lock().await.refreshes
    }

    /// Stops following the location.
    pub fn dispose(&self) {
        if let Some(subscription) = self.location_subscription.lock().take() {
            subscription.cancel();
        }
    }

    pub(crate) async fn lock(&self) -> RouterGuard<'_> {
        RouterGuard {
            router: self,
            state: self.state.lock().await,
        }
    }

    /// Runs the side effect a refresh deferred until after the lock.
    pub(crate) async fn complete(&self, outcome: RefreshOutcome) {
        if let RefreshOutcome::Redirect(location) = outcome {
            tracing::debug!("No route for intercepted navigation to {}, reloading", location);
            self.navigation.navigate_to(&location, true).await;
        }
    }
}

#[async_trait]
impl LocationObserver for Router {
    async fn on_location_changed(&self, event: &LocationChanged) {
        let mut guard = self.lock().await;
        guard.state.location = event.location.clone();
        guard.state.intercepted = event.is_navigation_intercepted;
        if !guard.is_initialized() {
            return;
        }

        let outcome = guard.refresh();
        drop(guard);
        match outcome {
            Ok(outcome) => self.complete(outcome).await,
            Err(e) => tracing::error!("Failed to route {}: {}", event.location, e),
        }
    }
}

/// Exclusive access to a router's state.
pub(crate) struct RouterGuard<'a> {
    router: &'a Router,
    state: tokio::sync::MutexGuard<'a, RouterState>,
}

impl RouterGuard<'_> {
    pub fn is_initialized(&self) -> bool {
        self.state.routes.get().is_some()
    }

    pub fn current(&self) -> Option<&RouteData> {
        self.state.current.as_ref()
    }

    pub fn previous(&self) -> Option<&RouteData> {
        self.state.previous.as_ref()
    }

    /// Replaces the route table; on error the previous table stays installed.
    pub fn rebuild(&mut self, types: Vec<ComponentType>) -> std::result::Result<(), RouteError> {
        let table = RouteTable::create(types, self.router.comparison)?;
        self.state.routes.update(Arc::new(table), |_, _| false);
        if self.state.phase == RouterPhase::Uninitialized {
            self.state.phase = RouterPhase::Initialized;
        }
        Ok(())
    }

    /// Drops the installed entries whose handler fails `keep`, leaving the
    /// rest of the table as it was.
    pub fn prune(&mut self, keep: impl Fn(&ComponentType) -> bool) {
        let Some(table) = self.state.routes.get().cloned() else {
            return;
        };
        let pruned = table.retain(keep);
        if pruned.len() != table.len() {
            tracing::debug!(
                "Pruned route table from {} to {} entries",
                table.len(),
                pruned.len()
            );
            self.state.routes.update(Arc::new(pruned), |_, _| false);
        }
    }

    /// Matches the current location and renders the result.
    pub fn refresh(&mut self) -> std::result::Result<RefreshOutcome, RouterError> {
        let table = self
            .state
            .routes
            .get()
            .cloned()
            .ok_or(RouterError::NotInitialized)?;
        let target = self.state.target.clone().ok_or(RouterError::NotAttached)?;

        let relative = self
            .router
            .navigation
            .to_base_relative_path(&self.state.location);
        let path = match relative.find(['?', '#']) {
            Some(end) => relative[..end].to_string(),
            None => relative,
        };

        let mut context = RouteContext::new(&path);
        table.route(&mut context);

        self.state.refreshes += 1;
        self.state.previous = self.state.current.take();

        let component = Capability::component();
        if let Some(handler) = context.handler {
            if !handler.implements(&component) {
                return Err(RouterError::InvalidHandlerType {
                    type_name: handler.to_string(),
                });
            }

            tracing::trace!("Routed '{}' to {}", path, handler);
            self.state.phase = RouterPhase::Routed { matched: true };
            self.state.current = Some(RouteData {
                page_type: handler.clone(),
                parameters: context.parameters.clone(),
            });
            target.render(RenderedView::Page {
                page_type: handler,
                parameters: context.parameters,
            });
            return Ok(RefreshOutcome::Rendered);
        }

        self.state.phase = RouterPhase::Routed { matched: false };
        if let Some(fallback) = self.state.fallback.clone() {
            if !fallback.implements(&component) {
                return Err(RouterError::InvalidHandlerType {
                    type_name: fallback.to_string(),
                });
            }
            target.render(RenderedView::Fallback {
                component: fallback,
                path,
            });
            return Ok(RefreshOutcome::Rendered);
        }

        if self.state.intercepted {
            return Ok(RefreshOutcome::Redirect(self.state.location.clone()));
        }

        tracing::debug!("No route matches '{}'", path);
        target.render(RenderedView::NotFound { path });
        Ok(RefreshOutcome::Rendered)
    }
}
