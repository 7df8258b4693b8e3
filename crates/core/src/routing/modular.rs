//! Router over the components of an [`AssemblySource`], with unload safety.
//!
//! After every assembly change the route table is rebuilt, and the rendered
//! view is re-evaluated whenever it (or the view before it, which the
//! renderer may still hold for diffing) belongs to an assembly that left the
//! source:
//!
//! 1. nothing rendered yet, or the last evaluation missed: refresh;
//! 2. the current handler's assembly is gone: refresh, then refresh again
//!    to flush the previous slot the first refresh filled with it;
//! 3. the previous handler's assembly is gone: refresh;
//! 4. otherwise keep the view.
//!
//! All steps run under the router lock, so no navigation is processed in
//! between. If the rebuilt table fails to build, the installed table loses
//! the entries of departed assemblies instead, the steps above still run, and
//! the build error is returned to whoever changed the source.

use super::router::{RefreshOutcome, RouteData, Router, RouterParameters, RoutableComponents};
use super::LiteralComparison;
use crate::assembly::{AssemblyChange, AssemblySnapshot, AssemblySource, ComponentResolver};
use crate::error::{Result, RouteError};
use crate::reactive::{AssemblyObserver, Subscription};
use async_trait::async_trait;
use modula_api::{ComponentType, NavigationManager, RenderTarget};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Routable components of every assembly currently in a source.
pub struct AssemblyRouteSource {
    source: Arc<AssemblySource>,
    resolver: Arc<ComponentResolver>,
    /// Snapshot version the last resolution was taken from.
    built_version: AtomicU64,
}

impl AssemblyRouteSource {
    pub fn new(source: Arc<AssemblySource>, resolver: Arc<ComponentResolver>) -> Self {
        Self {
            source,
            resolver,
            built_version: AtomicU64::new(0),
        }
    }

    pub fn resolve_from(&self, snapshot: &AssemblySnapshot) -> Vec<ComponentType> {
        self.built_version
            .fetch_max(snapshot.version(), Ordering::SeqCst);
        let mut types = Vec::new();
        for assembly in snapshot.assemblies() {
            types.extend(self.resolver.components(&assembly).iter().cloned());
        }
        types
    }

    pub fn built_version(&self) -> u64 {
        self.built_version.load(Ordering::SeqCst)
    }
}

impl RoutableComponents for AssemblyRouteSource {
    fn resolve_routable_components(&self) -> Vec<ComponentType> {
        self.resolve_from(&self.source.snapshot())
    }
}

pub struct ModularRouter {
    router: Arc<Router>,
    source: Arc<AssemblySource>,
    routes: Arc<AssemblyRouteSource>,
    assembly_subscription: parking_lot::Mutex<Option<Subscription>>,
}

impl ModularRouter {
    pub fn new(
        navigation: Arc<dyn NavigationManager>,
        source: Arc<AssemblySource>,
        resolver: Arc<ComponentResolver>,
        comparison: LiteralComparison,
    ) -> Arc<Self> {
        let routes = Arc::new(AssemblyRouteSource::new(source.clone(), resolver));
        let router = Router::new(navigation, routes.clone(), comparison);
        Arc::new(Self {
            router,
            source,
            routes,
            assembly_subscription: parking_lot::Mutex::new(None),
        })
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn source(&self) -> &Arc<AssemblySource> {
        &self.source
    }

    pub async fn attach(&self, target: Arc<dyn RenderTarget>) -> Result<()> {
        self.router.attach(target).await
    }

    /// Subscribes to assembly changes on first use, then builds and routes.
    pub async fn set_parameters(self: &Arc<Self>, parameters: RouterParameters) -> Result<()> {
        {
            let mut subscription = self.assembly_subscription.lock();
            if subscription.is_none() {
                *subscription = Some(Subscription::to_assemblies(
                    &self.source,
                    Arc::downgrade(self),
                ));
            }
        }
        self.router.set_parameters(parameters).await
    }

    pub async fn current_route(&self) -> Option<RouteData> {
        self.router.current_route().await
    }

    pub async fn previous_route(&self) -> Option<RouteData> {
        self.router.previous_route().await
    }

    pub fn dispose(&self) {
        if let Some(subscription) = self.assembly_subscription.lock().take() {
            subscription.cancel();
        }
        self.router.dispose();
    }

    /// Returns the refresh outcomes to complete, and the table build error
    /// if the new table could not be built.
    async fn handle_change(
        &self,
        change: &AssemblyChange,
    ) -> Result<(Vec<RefreshOutcome>, Option<RouteError>)> {
        let snapshot = &change.snapshot;
        let mut guard = self.router.lock().await;
        if !guard.is_initialized() {
            return Ok((Vec::new(), None));
        }
        if snapshot.version() < self.routes.built_version() {
            tracing::trace!(
                "Skipping stale assembly snapshot {} (built from {})",
                snapshot.version(),
                self.routes.built_version()
            );
            return Ok((Vec::new(), None));
        }

        let failure = guard.rebuild(self.routes.resolve_from(snapshot)).err();
        if let Some(e) = &failure {
            tracing::warn!("Route table rebuild failed after {:?}: {}", change.kind, e);
            guard.prune(|handler| snapshot.contains(&handler.assembly));
        }

        let missing = |route: Option<&RouteData>| {
            route.is_some_and(|r| !snapshot.contains(&r.page_type.assembly))
        };

        let refreshes = if guard.current().is_none() {
            1
        } else if missing(guard.current()) {
            tracing::debug!("Rendered route belongs to a removed assembly, refreshing twice");
            2
        } else if missing(guard.previous()) {
            1
        } else {
            0
        };

        let mut outcomes = Vec::with_capacity(refreshes);
        for _ in 0..refreshes {
            outcomes.push(guard.refresh()?);
        }
        outcomes.dedup();
        Ok((outcomes, failure))
    }
}

#[async_trait]
impl AssemblyObserver for ModularRouter {
    async fn on_assemblies_changed(&self, change: &AssemblyChange) -> Result<()> {
        let (outcomes, failure) = self.handle_change(change).await?;
        for outcome in outcomes {
            self.router.complete(outcome).await;
        }
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
