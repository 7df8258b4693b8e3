#![allow(dead_code)]

use modula_api::{Assembly, ComponentType, RenderedView};
use modula_core::assembly::{AssemblySource, ComponentResolver};
use modula_core::navigation::InMemoryNavigation;
use modula_core::render::RecordingRenderTarget;
use modula_core::routing::{LiteralComparison, ModularRouter, RouterParameters};
use std::sync::Arc;

pub const BASE_URI: &str = "http://localhost/";

/// A component assembly exporting one page per `(type name, template)`.
pub fn pages(id: &str, routes: &[(&str, &str)]) -> Arc<Assembly> {
    let mut assembly = Assembly::new(id).with_reference("Components");
    for (name, template) in routes {
        assembly = assembly.with_type(ComponentType::component(id, name).with_route(template));
    }
    Arc::new(assembly)
}

pub struct Harness {
    pub navigation: Arc<InMemoryNavigation>,
    pub source: Arc<AssemblySource>,
    pub resolver: Arc<ComponentResolver>,
    pub router: Arc<ModularRouter>,
    pub target: Arc<RecordingRenderTarget>,
}

impl Harness {
    pub async fn start(
        location: &str,
        assemblies: Vec<Arc<Assembly>>,
        fallback: Option<ComponentType>,
    ) -> Self {
        let navigation = Arc::new(InMemoryNavigation::new(BASE_URI).with_location(location));
        let source = Arc::new(AssemblySource::new());
        for assembly in assemblies {
            source.add_assembly(assembly, None).await.unwrap();
        }
        let resolver = Arc::new(ComponentResolver::default());
        let router = ModularRouter::new(
            navigation.clone(),
            source.clone(),
            resolver.clone(),
            LiteralComparison::Ordinal,
        );
        let target = Arc::new(RecordingRenderTarget::new());
        router.attach(target.clone()).await.unwrap();
        router
            .set_parameters(RouterParameters { fallback })
            .await
            .unwrap();

        Self {
            navigation,
            source,
            resolver,
            router,
            target,
        }
    }

    /// Name of the page currently rendered, if the last view was a page.
    pub fn rendered_page(&self) -> Option<String> {
        match self.target.last()? {
            RenderedView::Page { page_type, .. } => Some(page_type.name.to_string()),
            _ => None,
        }
    }
}
