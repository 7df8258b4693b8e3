use crate::error::ModuleError;
use dashmap::DashMap;
use modula_api::{ManifestDispatcher, ModuleId, ModuleManifest, ModulePropertiesLookup};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fetches module manifests from the end points a module runs on.
///
/// Successful results are cached per module until invalidated.
pub struct ModuleManifestProvider {
    lookup: Arc<dyn ModulePropertiesLookup>,
    dispatcher: Arc<dyn ManifestDispatcher>,
    cache: DashMap<ModuleId, Arc<ModuleManifest>>,
}

impl ModuleManifestProvider {
    pub fn new(lookup: Arc<dyn ModulePropertiesLookup>, dispatcher: Arc<dyn ManifestDispatcher>) -> Self {
        Self {
            lookup,
            dispatcher,
            cache: DashMap::new(),
        }
    }

    pub async fn get_manifest(
        &self,
        module: &ModuleId,
        bypass_cache: bool,
        cancel: &CancellationToken,
    ) -> Result<Arc<ModuleManifest>, ModuleError> {
        tracing::debug!("Requesting manifest for module {}", module);

        if !bypass_cache {
            if let Some(cached) = self.cache.get(module) {
                tracing::trace!("Loaded manifest for module {} from cache", module);
                return Ok(cached.clone());
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ModuleError::Cancelled),
            result = self.fetch(module) => result,
        }
    }

    pub fn invalidate(&self, module: &ModuleId) {
        self.cache.remove(module);
    }

    async fn fetch(&self, module: &ModuleId) -> Result<Arc<ModuleManifest>, ModuleError> {
        let unavailable = |reason: String| {
            tracing::error!("Unable to load manifest for {}. {}", module, reason);
            ModuleError::ManifestUnavailable {
                module: module.clone(),
                reason,
            }
        };

        let properties = match self.lookup.lookup(module).await {
            Ok(Some(properties)) => properties,
            Ok(None) => {
                return Err(unavailable(
                    "The module properties could not be fetched.".to_string(),
                ));
            }
            Err(e) => return Err(unavailable(format!("Property lookup failed: {e}"))),
        };

        for end_point in &properties.end_points {
            match self.dispatcher.query_manifest(end_point, module).await {
                Ok(Some(manifest)) => {
                    let manifest = Arc::new(manifest);
                    self.cache.insert(module.clone(), manifest.clone());
                    tracing::debug!("Loaded manifest for module {} from {}", module, end_point);
                    return Ok(manifest);
                }
                Ok(None) => {
                    tracing::warn!(
                        "Unable to load manifest for {} from end-point {}: no manifest",
                        module,
                        end_point
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Unable to load manifest for {} from end-point {}: {}",
                        module,
                        end_point,
                        e
                    );
                }
            }
        }

        if properties.end_points.is_empty() {
            Err(unavailable("No end-points available.".to_string()))
        } else {
            Err(unavailable("No end-point matched.".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::InMemoryModuleDirectory;
    use async_trait::async_trait;
    use modula_api::{ApiResult, EndPoint, ModuleProperties};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manifest(name: &str) -> ModuleManifest {
        ModuleManifest {
            name: name.to_string(),
            assemblies: Vec::new(),
        }
    }

    fn provider(directory: &Arc<InMemoryModuleDirectory>) -> ModuleManifestProvider {
        ModuleManifestProvider::new(directory.clone(), directory.clone())
    }

    #[tokio::test]
    async fn test_falls_through_failing_end_points() {
        let directory = Arc::new(InMemoryModuleDirectory::new());
        let module = ModuleId::new("Shop");
        let down = EndPoint("shop-1".into());
        let up = EndPoint("shop-2".into());
        directory.register(module.clone(), down.clone(), manifest("stale"));
        directory.register(module.clone(), up, manifest("Shop"));
        directory.set_unreachable(down, true);

        let result = provider(&directory)
            .get_manifest(&module, false, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.name, "Shop");
    }

    #[tokio::test]
    async fn test_unavailable_reasons() {
        let directory = Arc::new(InMemoryModuleDirectory::new());
        let provider = provider(&directory);
        let cancel = CancellationToken::new();

        let err = provider
            .get_manifest(&ModuleId::new("Ghost"), false, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::ManifestUnavailable { ref reason, .. } if reason.contains("properties")));

        directory.register_properties(ModuleId::new("Empty"), ModuleProperties::default());
        let err = provider
            .get_manifest(&ModuleId::new("Empty"), false, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::ManifestUnavailable { ref reason, .. } if reason.contains("No end-points")));
    }

    struct CountingDispatcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ManifestDispatcher for CountingDispatcher {
        async fn query_manifest(
            &self,
            _end_point: &EndPoint,
            module: &ModuleId,
        ) -> ApiResult<Option<ModuleManifest>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(manifest(module.as_str())))
        }
    }

    #[tokio::test]
    async fn test_cache_and_bypass() {
        let directory = Arc::new(InMemoryModuleDirectory::new());
        let module = ModuleId::new("Shop");
        directory.register_properties(
            module.clone(),
            ModuleProperties {
                end_points: vec![EndPoint("shop".into())],
            },
        );
        let dispatcher = Arc::new(CountingDispatcher {
            calls: AtomicUsize::new(0),
        });
        let provider = ModuleManifestProvider::new(directory, dispatcher.clone());
        let cancel = CancellationToken::new();

        provider.get_manifest(&module, false, &cancel).await.unwrap();
        provider.get_manifest(&module, false, &cancel).await.unwrap();
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 1);

        provider.get_manifest(&module, true, &cancel).await.unwrap();
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let directory = Arc::new(InMemoryModuleDirectory::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = provider(&directory)
            .get_manifest(&ModuleId::new("Shop"), false, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, ModuleError::Cancelled);
    }
}
