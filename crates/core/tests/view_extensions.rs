use indexmap::IndexMap;
use modula_api::{Assembly, AssemblyId, Capability, ComponentType, RenderedView};
use modula_core::assembly::{AssemblySource, ComponentResolver};
use modula_core::error::{ModulaError, RouterError};
use modula_core::extensibility::{PlaceholderParameters, ViewExtensionPlaceholder};
use modula_core::render::RecordingRenderTarget;
use serde_json::json;
use std::sync::Arc;

const TOOLBAR: &str = "Shell.IToolbarItem";

fn toolbar_items(id: &str, names: &[&str]) -> Arc<Assembly> {
    let mut assembly = Assembly::new(id).with_reference("Components");
    for name in names {
        assembly = assembly.with_type(
            ComponentType::component(id, name).with_capability(Capability::new(TOOLBAR)),
        );
    }
    // A plain component that is not an extension.
    assembly = assembly.with_type(ComponentType::component(id, format!("{id}.Page")));
    Arc::new(assembly)
}

async fn placeholder(
    source: &Arc<AssemblySource>,
) -> (Arc<ViewExtensionPlaceholder>, Arc<RecordingRenderTarget>) {
    let placeholder = ViewExtensionPlaceholder::new(
        Capability::new(TOOLBAR),
        source.clone(),
        Arc::new(ComponentResolver::default()),
    );
    let target = Arc::new(RecordingRenderTarget::new());
    placeholder.attach(target.clone()).await.unwrap();
    (placeholder, target)
}

fn names(view: Option<RenderedView>) -> Vec<String> {
    match view {
        Some(RenderedView::Extensions { items }) => {
            items.iter().map(|i| i.component.name.to_string()).collect()
        }
        other => panic!("expected extensions, got {other:?}"),
    }
}

#[tokio::test]
async fn test_renders_every_implementation() {
    let source = Arc::new(AssemblySource::new());
    source.add_assembly(toolbar_items("Shop", &["Shop.Cart"]), None).await.unwrap();
    source
        .add_assembly(toolbar_items("Blog", &["Blog.Search", "Blog.Feed"]), None)
        .await
        .unwrap();

    let (placeholder, target) = placeholder(&source).await;
    let mut attributes = IndexMap::new();
    attributes.insert("class".to_string(), json!("compact"));
    placeholder
        .set_parameters(PlaceholderParameters {
            context: Some(json!({"user": "ada"})),
            attributes,
        })
        .await
        .unwrap();

    assert_eq!(names(target.last()), ["Blog.Feed", "Blog.Search", "Shop.Cart"]);
    let Some(RenderedView::Extensions { items }) = target.last() else {
        unreachable!()
    };
    assert!(items.iter().all(|i| i.context == Some(json!({"user": "ada"}))));
    assert!(items.iter().all(|i| i.attributes.get("class") == Some(&json!("compact"))));
}

#[tokio::test]
async fn test_rerenders_only_when_the_set_changes() {
    let source = Arc::new(AssemblySource::new());
    source.add_assembly(toolbar_items("Shop", &["Shop.Cart"]), None).await.unwrap();
    let (placeholder, target) = placeholder(&source).await;
    placeholder.set_parameters(PlaceholderParameters::default()).await.unwrap();
    assert_eq!(target.len(), 1);

    source.add_assembly(toolbar_items("Empty", &[]), None).await.unwrap();
    assert_eq!(target.len(), 1);

    source.add_assembly(toolbar_items("Blog", &["Blog.Search"]), None).await.unwrap();
    assert_eq!(target.len(), 2);
    assert_eq!(names(target.last()), ["Blog.Search", "Shop.Cart"]);

    source.remove_assembly(&AssemblyId::new("Shop")).await.unwrap();
    assert_eq!(target.len(), 3);
    assert_eq!(names(target.last()), ["Blog.Search"]);
    assert_eq!(placeholder.extensions().await.len(), 1);
}

#[tokio::test]
async fn test_set_parameters_requires_attach() {
    let source = Arc::new(AssemblySource::new());
    let placeholder = ViewExtensionPlaceholder::new(
        Capability::new(TOOLBAR),
        source.clone(),
        Arc::new(ComponentResolver::default()),
    );
    let err = placeholder
        .set_parameters(PlaceholderParameters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ModulaError::Router(RouterError::NotAttached)));
    assert_eq!(source.listener_count(), 0);

    let target = Arc::new(RecordingRenderTarget::new());
    placeholder.attach(target.clone()).await.unwrap();
    let err = placeholder.attach(target).await.unwrap_err();
    assert!(matches!(err, ModulaError::Router(RouterError::AlreadyAttached)));
}

#[tokio::test]
async fn test_dispose_stops_following_the_source() {
    let source = Arc::new(AssemblySource::new());
    let (placeholder, target) = placeholder(&source).await;
    placeholder.set_parameters(PlaceholderParameters::default()).await.unwrap();
    assert!(names(target.last()).is_empty());
    assert_eq!(source.listener_count(), 1);

    placeholder.dispose();
    source.add_assembly(toolbar_items("Shop", &["Shop.Cart"]), None).await.unwrap();

    assert_eq!(source.listener_count(), 0);
    assert_eq!(target.len(), 1);
}
