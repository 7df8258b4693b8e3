use async_trait::async_trait;
use dashmap::DashMap;
use modula_api::{
    ApiError, ApiResult, EndPoint, ManifestDispatcher, ModuleId, ModuleManifest, ModuleProperties,
    ModulePropertiesLookup,
};
use std::collections::HashSet;

/// Module registry and message bus kept in memory.
///
/// Answers property lookups and manifest queries the way remote end points
/// would; end points marked unreachable fail with a transport error.
#[derive(Default)]
pub struct InMemoryModuleDirectory {
    properties: DashMap<ModuleId, ModuleProperties>,
    manifests: DashMap<(EndPoint, ModuleId), ModuleManifest>,
    unreachable: parking_lot::RwLock<HashSet<EndPoint>>,
}

impl InMemoryModuleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announces that `end_point` serves `manifest` for `module`.
    pub fn register(&self, module: ModuleId, end_point: EndPoint, manifest: ModuleManifest) {
        let mut properties = self.properties.entry(module.clone()).or_default();
        if !properties.end_points.contains(&end_point) {
            properties.end_points.push(end_point.clone());
        }
        drop(properties);
        self.manifests.insert((end_point, module), manifest);
    }

    /// Registers a module whose end points serve nothing.
    pub fn register_properties(&self, module: ModuleId, properties: ModuleProperties) {
        self.properties.insert(module, properties);
    }

    pub fn set_unreachable(&self, end_point: EndPoint, unreachable: bool) {
        let mut set = self.unreachable.write();
        if unreachable {
            set.insert(end_point);
        } else {
            set.remove(&end_point);
        }
    }
}

#[async_trait]
impl ModulePropertiesLookup for InMemoryModuleDirectory {
    async fn lookup(&self, module: &ModuleId) -> ApiResult<Option<ModuleProperties>> {
        Ok(self.properties.get(module).map(|p| p.clone()))
    }
}

#[async_trait]
impl ManifestDispatcher for InMemoryModuleDirectory {
    async fn query_manifest(
        &self,
        end_point: &EndPoint,
        module: &ModuleId,
    ) -> ApiResult<Option<ModuleManifest>> {
        if self.unreachable.read().contains(end_point) {
            return Err(ApiError::Transport(format!("end point {end_point} is unreachable")));
        }
        Ok(self
            .manifests
            .get(&(end_point.clone(), module.clone()))
            .map(|m| m.clone()))
    }
}
