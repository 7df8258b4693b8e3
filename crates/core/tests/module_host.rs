mod common;

use async_trait::async_trait;
use common::{Harness, pages};
use modula_api::{Assembly, AssemblyId, EndPoint, ModuleId};
use modula_core::assembly::{AssemblyChange, AssemblyChangeKind, AssemblyListener, InMemoryCatalog};
use modula_core::error::{AssemblyError, ModulaError, ModuleError, RouteError};
use modula_core::modules::{
    InMemoryModuleDirectory, ModuleHost, ModuleManifestProvider, build_manifest,
};
use smol_str::SmolStr;
use std::sync::{Arc, Mutex, Weak};
use tokio_util::sync::CancellationToken;

fn shop_assemblies() -> Vec<Arc<Assembly>> {
    vec![
        pages("Shop.Ui", &[("Shop.Ui.Cart", "/cart"), ("Shop.Ui.Item", "/items/{id:int}")]),
        Arc::new(Assembly::new("Shop.Model").with_version("2.0.0")),
    ]
}

struct Fixture {
    harness: Harness,
    directory: Arc<InMemoryModuleDirectory>,
    host: Arc<ModuleHost>,
}

async fn fixture(location: &str, catalog_assemblies: Vec<Arc<Assembly>>) -> Fixture {
    let harness = Harness::start(location, Vec::new(), None).await;
    let catalog = InMemoryCatalog::new(catalog_assemblies.iter().map(|a| a.as_ref().clone()));

    let directory = Arc::new(InMemoryModuleDirectory::new());
    directory.register(
        ModuleId::new("Shop"),
        EndPoint(SmolStr::new("shop-1")),
        build_manifest("Shop", &shop_assemblies(), &AssemblyId::new("Components")),
    );
    let provider = Arc::new(ModuleManifestProvider::new(directory.clone(), directory.clone()));
    let host = Arc::new(ModuleHost::new(
        provider,
        Arc::new(catalog),
        harness.source.clone(),
        harness.resolver.clone(),
    ));
    Fixture {
        harness,
        directory,
        host,
    }
}

#[tokio::test]
async fn test_install_makes_module_routes_live() {
    let fixture = fixture("cart", shop_assemblies()).await;
    assert_eq!(fixture.harness.rendered_page(), None);

    let added = fixture
        .host
        .install(&ModuleId::new("Shop"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(added, vec![AssemblyId::new("Shop.Ui")]);
    assert_eq!(fixture.harness.rendered_page().as_deref(), Some("Shop.Ui.Cart"));
    assert!(fixture.harness.source.can_unload(&AssemblyId::new("Shop.Ui")));
    assert_eq!(fixture.host.installed().await, vec![ModuleId::new("Shop")]);
    assert!(fixture.host.loader_context(&ModuleId::new("Shop")).await.unwrap().collectible);
}

#[tokio::test]
async fn test_uninstall_releases_the_rendered_page() {
    let fixture = fixture("items/4", shop_assemblies()).await;
    let shop = ModuleId::new("Shop");
    fixture.host.install(&shop, &CancellationToken::new()).await.unwrap();
    assert_eq!(fixture.harness.rendered_page().as_deref(), Some("Shop.Ui.Item"));

    let removed = fixture.host.uninstall(&shop).await.unwrap();

    assert_eq!(removed, vec![AssemblyId::new("Shop.Ui")]);
    assert!(fixture.harness.router.current_route().await.is_none());
    assert!(fixture.harness.router.previous_route().await.is_none());
    assert!(fixture.harness.source.snapshot().is_empty());
    assert!(matches!(
        fixture.host.uninstall(&shop).await,
        Err(ModulaError::Module(ModuleError::NotInstalled(_)))
    ));
}

#[tokio::test]
async fn test_install_twice_is_rejected() {
    let fixture = fixture("cart", shop_assemblies()).await;
    let shop = ModuleId::new("Shop");
    fixture.host.install(&shop, &CancellationToken::new()).await.unwrap();

    assert!(matches!(
        fixture.host.install(&shop, &CancellationToken::new()).await,
        Err(ModulaError::Module(ModuleError::AlreadyInstalled(_)))
    ));
}

#[tokio::test]
async fn test_missing_assembly_adds_nothing() {
    let fixture = fixture("cart", Vec::new()).await;

    let err = fixture
        .host
        .install(&ModuleId::new("Shop"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ModulaError::Module(ModuleError::AssemblyNotFound { ref assembly, .. }) if assembly == "Shop.Ui"
    ));
    assert!(fixture.harness.source.snapshot().is_empty());
    assert!(fixture.host.installed().await.is_empty());
}

#[tokio::test]
async fn test_unreachable_module_reports_manifest_failure() {
    let fixture = fixture("cart", shop_assemblies()).await;
    fixture
        .directory
        .set_unreachable(EndPoint(SmolStr::new("shop-1")), true);

    let err = fixture
        .host
        .install(&ModuleId::new("Shop"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ModulaError::Module(ModuleError::ManifestUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_install_adds_nothing() {
    let fixture = fixture("cart", shop_assemblies()).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fixture
        .host
        .install(&ModuleId::new("Shop"), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ModulaError::Module(ModuleError::Cancelled)));
    assert!(fixture.harness.source.snapshot().is_empty());
}

fn broken_assemblies() -> Vec<Arc<Assembly>> {
    vec![
        pages("Broken.Home", &[("Broken.Home.Page", "/home")]),
        pages("Broken.Ui", &[("Broken.Ui.Page", "/a//b")]),
    ]
}

#[tokio::test]
async fn test_module_with_malformed_route_is_rolled_back() {
    let fixture = fixture("home", broken_assemblies()).await;
    fixture.directory.register(
        ModuleId::new("Broken"),
        EndPoint(SmolStr::new("broken-1")),
        build_manifest("Broken", &broken_assemblies(), &AssemblyId::new("Components")),
    );

    let err = fixture
        .host
        .install(&ModuleId::new("Broken"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ModulaError::Route(RouteError::MalformedTemplate { .. })
    ));
    assert!(fixture.harness.source.snapshot().is_empty());
    assert!(fixture.host.installed().await.is_empty());
    assert!(fixture.harness.router.current_route().await.is_none());
    assert!(fixture.harness.router.previous_route().await.is_none());
}

/// Uninstalls a module from inside the source's own change notification.
struct UninstallOnTrigger {
    host: Weak<ModuleHost>,
    module: ModuleId,
    result: Mutex<Option<modula_core::Result<Vec<AssemblyId>>>>,
}

#[async_trait]
impl AssemblyListener for UninstallOnTrigger {
    async fn assemblies_changed(&self, change: &AssemblyChange) -> modula_core::Result<()> {
        if change.kind != AssemblyChangeKind::Added(AssemblyId::new("Trigger")) {
            return Ok(());
        }
        if let Some(host) = self.host.upgrade() {
            let result = host.uninstall(&self.module).await;
            *self.result.lock().unwrap() = Some(result);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_uninstall_keeps_the_module_record() {
    let fixture = fixture("cart", shop_assemblies()).await;
    let shop = ModuleId::new("Shop");
    fixture.host.install(&shop, &CancellationToken::new()).await.unwrap();

    let listener = Arc::new(UninstallOnTrigger {
        host: Arc::downgrade(&fixture.host),
        module: shop.clone(),
        result: Mutex::new(None),
    });
    fixture.harness.source.subscribe(listener.clone());
    fixture
        .harness
        .source
        .add_assembly(Arc::new(Assembly::new("Trigger")), None)
        .await
        .unwrap();

    let result = listener.result.lock().unwrap().take().unwrap();
    assert!(matches!(
        result,
        Err(ModulaError::Assembly(AssemblyError::ReentrantMutation(_)))
    ));
    assert_eq!(fixture.host.installed().await, vec![shop.clone()]);
    assert!(fixture.harness.source.contains_assembly(&AssemblyId::new("Shop.Ui")));
    assert_eq!(fixture.harness.rendered_page().as_deref(), Some("Shop.Ui.Cart"));

    let removed = fixture.host.uninstall(&shop).await.unwrap();
    assert_eq!(removed, vec![AssemblyId::new("Shop.Ui")]);
    assert!(fixture.host.installed().await.is_empty());
    assert!(!fixture.harness.source.contains_assembly(&AssemblyId::new("Shop.Ui")));
}
