use super::provider::ModuleManifestProvider;
use crate::assembly::{AssemblySource, ComponentResolver};
use crate::error::{ModuleError, Result};
use indexmap::IndexMap;
use modula_api::{Assembly, AssemblyCatalog, AssemblyId, LoaderContext, ModuleId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct InstalledModule {
    loader: LoaderContext,
    assemblies: Vec<AssemblyId>,
}

/// Installs remote modules into an [`AssemblySource`].
///
/// Every module gets its own collectible loader context, so uninstalling it
/// makes all of its assemblies eligible for unloading.
pub struct ModuleHost {
    provider: Arc<ModuleManifestProvider>,
    catalog: Arc<dyn AssemblyCatalog>,
    source: Arc<AssemblySource>,
    resolver: Arc<ComponentResolver>,
    bypass_manifest_cache: bool,
    installed: tokio::sync::Mutex<IndexMap<ModuleId, InstalledModule>>,
    next_context: AtomicU64,
}

impl ModuleHost {
    pub fn new(
        provider: Arc<ModuleManifestProvider>,
        catalog: Arc<dyn AssemblyCatalog>,
        source: Arc<AssemblySource>,
        resolver: Arc<ComponentResolver>,
    ) -> Self {
        Self {
            provider,
            catalog,
            source,
            resolver,
            bypass_manifest_cache: false,
            installed: tokio::sync::Mutex::new(IndexMap::new()),
            next_context: AtomicU64::new(1),
        }
    }

    pub fn with_bypass_manifest_cache(mut self, bypass: bool) -> Self {
        self.bypass_manifest_cache = bypass;
        self
    }

    pub async fn installed(&self) -> Vec<ModuleId> {
        self.installed.lock().await.keys().cloned().collect()
    }

    pub async fn loader_context(&self, module: &ModuleId) -> Option<LoaderContext> {
        self.installed
            .lock()
            .await
            .get(module)
            .map(|m| m.loader.clone())
    }

    /// Fetches the module's manifest and adds its component assemblies.
    ///
    /// Nothing is added unless every listed component assembly is available,
    /// and a module whose additions fail (for instance because a route
    /// template does not parse) is removed again. Returns after all listeners of the assembly source have handled the
    /// additions.
    pub async fn install(&self, module: &ModuleId, cancel: &CancellationToken) -> Result<Vec<AssemblyId>> {
        let mut installed = self.installed.lock().await;
        if installed.contains_key(module) {
            return Err(ModuleError::AlreadyInstalled(module.clone()).into());
        }

        let manifest = self
            .provider
            .get_manifest(module, self.bypass_manifest_cache, cancel)
            .await?;

        let assemblies = manifest
            .component_assemblies()
            .map(|entry| {
                self.catalog
                    .load(&AssemblyId::new(&entry.assembly_name))
                    .ok_or_else(|| ModuleError::AssemblyNotFound {
                        module: module.clone(),
                        assembly: entry.assembly_name.clone(),
                    })
            })
            .collect::<std::result::Result<Vec<Arc<Assembly>>, _>>()?;

        let loader = LoaderContext::collectible(
            self.next_context.fetch_add(1, Ordering::Relaxed),
            module.as_str(),
        );

        let mut added = Vec::new();
        for assembly in assemblies {
            let id = assembly.id.clone();
            match self.source.add_assembly(assembly, Some(loader.clone())).await {
                Ok(_) => added.push(id),
                Err(e) => {
                    tracing::warn!("Rolling back install of {}: {}", module, e);
                    // A listener failure leaves the assembly in the source.
                    if self.source.loader_context(&id).as_ref() == Some(&loader) {
                        added.push(id);
                    }
                    self.roll_back(module, &added).await;
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Installed module {} ({} assemblies, {})",
            module,
            added.len(),
            loader.id
        );
        installed.insert(
            module.clone(),
            InstalledModule {
                loader,
                assemblies: added.clone(),
            },
        );
        Ok(added)
    }

    /// Removes the module's assemblies from the source.
    ///
    /// The module stays installed until every removal succeeds; after a
    /// failure it lists the assemblies still in the source, and uninstalling
    /// again picks up from there.
    pub async fn uninstall(&self, module: &ModuleId) -> Result<Vec<AssemblyId>> {
        let mut installed = self.installed.lock().await;
        let Some(entry) = installed.get(module).cloned() else {
            return Err(ModuleError::NotInstalled(module.clone()).into());
        };

        for id in &entry.assemblies {
            let removed = self.source.remove_assembly(id).await;
            if !self.source.contains_assembly(id) {
                self.resolver.evict(id);
            }
            if let Err(e) = removed {
                let remaining: Vec<_> = entry
                    .assemblies
                    .iter()
                    .filter(|id| self.source.contains_assembly(id))
                    .cloned()
                    .collect();
                tracing::warn!(
                    "Uninstall of {} stopped at {} ({} assemblies left): {}",
                    module,
                    id,
                    remaining.len(),
                    e
                );
                if remaining.is_empty() {
                    installed.shift_remove(module);
                } else if let Some(record) = installed.get_mut(module) {
                    record.assemblies = remaining;
                }
                return Err(e);
            }
        }

        installed.shift_remove(module);
        tracing::info!("Uninstalled module {} ({})", module, entry.loader.id);
        Ok(entry.assemblies)
    }

    async fn roll_back(&self, module: &ModuleId, added: &[AssemblyId]) {
        for id in added.iter().rev() {
            if let Err(e) = self.source.remove_assembly(id).await {
                tracing::warn!("Removing {} while rolling back {}: {}", id, module, e);
            }
            self.resolver.evict(id);
        }
    }
}
