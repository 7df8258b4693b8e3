use modula_api::{AssemblyCatalog, AssemblyId, ComponentType, RenderedView};
use modula_core::ModulaError;
use modula_core::assembly::{AssemblySource, ComponentResolver, InMemoryCatalog};
use modula_core::config::ModulaConfig;
use modula_core::modules::{InMemoryModuleDirectory, ModuleHost, ModuleManifestProvider};
use modula_core::navigation::InMemoryNavigation;
use modula_core::render::RecordingRenderTarget;
use modula_core::routing::{ModularRouter, RouterParameters};
use std::sync::Arc;

/// A modular router wired to in-memory collaborators.
pub struct ModulaHost {
    pub config: ModulaConfig,
    pub catalog: Arc<InMemoryCatalog>,
    pub source: Arc<AssemblySource>,
    pub resolver: Arc<ComponentResolver>,
    pub navigation: Arc<InMemoryNavigation>,
    pub router: Arc<ModularRouter>,
    pub target: Arc<RecordingRenderTarget>,
    pub directory: Arc<InMemoryModuleDirectory>,
    pub modules: ModuleHost,
}

impl ModulaHost {
    /// Views rendered since the last call, oldest first.
    pub fn take_rendered(&self) -> Vec<RenderedView> {
        self.target.take()
    }

    pub fn dispose(&self) {
        self.router.dispose();
    }
}

/// Bootstraps a host from `config` and `catalog`.
///
/// The assembly source is seeded with the component assemblies reachable
/// from `entry` (or the catalog's own entry); without one it starts empty.
/// The router is attached and has rendered `location` when this returns.
pub async fn build_default_host(
    config: ModulaConfig,
    catalog: InMemoryCatalog,
    entry: Option<AssemblyId>,
    location: &str,
) -> modula_core::Result<ModulaHost> {
    let catalog = Arc::new(catalog);
    let resolver = Arc::new(ComponentResolver::new(
        config.resolver.contract_assembly.as_str(),
    ));

    let source = match entry.or_else(|| catalog.entry().cloned()) {
        Some(entry) => {
            let source = AssemblySource::from_entry_assembly(catalog.as_ref(), &resolver, &entry)?;
            tracing::info!(
                "Seeded assembly source from {} with {} assemblies",
                entry,
                source.snapshot().len()
            );
            source
        }
        None => AssemblySource::new(),
    };
    let source = Arc::new(source);

    let fallback = match &config.router.fallback {
        Some(name) => Some(find_component(catalog.as_ref(), name)?),
        None => None,
    };

    let navigation =
        Arc::new(InMemoryNavigation::new(&config.router.base_uri).with_location(location));
    let router = ModularRouter::new(
        navigation.clone(),
        source.clone(),
        resolver.clone(),
        config.router.literal_comparison,
    );
    let target = Arc::new(RecordingRenderTarget::new());
    router.attach(target.clone()).await?;
    router.set_parameters(RouterParameters { fallback }).await?;

    let directory = Arc::new(InMemoryModuleDirectory::new());
    let provider = Arc::new(ModuleManifestProvider::new(
        directory.clone(),
        directory.clone(),
    ));
    let modules = ModuleHost::new(provider, catalog.clone(), source.clone(), resolver.clone())
        .with_bypass_manifest_cache(config.modules.bypass_manifest_cache);

    Ok(ModulaHost {
        config,
        catalog,
        source,
        resolver,
        navigation,
        router,
        target,
        directory,
        modules,
    })
}

/// Looks a component type up by full name across the catalog.
pub fn find_component(
    catalog: &dyn AssemblyCatalog,
    name: &str,
) -> modula_core::Result<ComponentType> {
    catalog
        .assemblies()
        .iter()
        .flat_map(|assembly| assembly.types.iter())
        .find(|ty| ty.name == name)
        .cloned()
        .ok_or_else(|| ModulaError::Internal(format!("Component type {name} not found in catalog")))
}

/// Starts logging for `component` as configured in `config.logging`.
pub fn init_logging(
    component: &str,
    config: &ModulaConfig,
    to_stderr: bool,
) -> tracing_appender::non_blocking::WorkerGuard {
    modula_core::logging::init_logging(component, &config.logging, to_stderr)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "entry": "App",
        "assemblies": [
            {
                "id": "App",
                "references": ["Components", "Shop"],
                "types": [
                    { "name": "App.Home", "assembly": "App", "capabilities": ["Components.IComponent"], "routes": ["/"] },
                    { "name": "App.Missing", "assembly": "App", "capabilities": ["Components.IComponent"] }
                ]
            },
            {
                "id": "Shop",
                "references": ["Components"],
                "types": [
                    { "name": "Shop.Cart", "assembly": "Shop", "capabilities": ["Components.IComponent"], "routes": ["/cart"] }
                ]
            },
            { "id": "Components" }
        ]
    }"#;

    #[tokio::test]
    async fn test_host_routes_entry_closure() {
        let catalog = InMemoryCatalog::from_json(CATALOG).unwrap();
        let host = build_default_host(ModulaConfig::default(), catalog, None, "cart")
            .await
            .unwrap();

        assert_eq!(host.source.snapshot().len(), 2);
        match host.take_rendered().as_slice() {
            [RenderedView::Page { page_type, .. }] => assert_eq!(page_type.name, "Shop.Cart"),
            other => panic!("unexpected views {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_configured_fallback_is_resolved_from_catalog() {
        let catalog = InMemoryCatalog::from_json(CATALOG).unwrap();
        let mut config = ModulaConfig::default();
        config.router.fallback = Some("App.Missing".to_string());

        let host = build_default_host(config, catalog, None, "nowhere").await.unwrap();
        assert!(matches!(
            host.target.last(),
            Some(RenderedView::Fallback { component, .. }) if component.name == "App.Missing"
        ));
    }

    #[tokio::test]
    async fn test_unknown_fallback_is_an_error() {
        let catalog = InMemoryCatalog::from_json(CATALOG).unwrap();
        let mut config = ModulaConfig::default();
        config.router.fallback = Some("App.Nope".to_string());

        let result = build_default_host(config, catalog, None, "").await;
        assert!(matches!(result, Err(ModulaError::Internal(_))));
    }
}
