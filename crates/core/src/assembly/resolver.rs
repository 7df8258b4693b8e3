//! Derives routable components and view extensions from assembly metadata.

use dashmap::DashMap;
use modula_api::{Assembly, AssemblyCatalog, AssemblyId, Capability, ComponentType};
use std::collections::HashSet;
use std::sync::Arc;

/// Maps assemblies to the component types they export.
///
/// Assembly metadata never changes once loaded, so results are cached per
/// assembly identity for the resolver's lifetime. Hosts that reuse an
/// identity for different contents must call [`ComponentResolver::evict`].
pub struct ComponentResolver {
    contract_assembly: AssemblyId,
    component_capability: Capability,
    components: DashMap<AssemblyId, Arc<Vec<ComponentType>>>,
    extensions: DashMap<(AssemblyId, Capability), Arc<Vec<ComponentType>>>,
}

impl Default for ComponentResolver {
    fn default() -> Self {
        Self::new("Components")
    }
}

impl ComponentResolver {
    pub fn new(contract_assembly: impl Into<AssemblyId>) -> Self {
        Self {
            contract_assembly: contract_assembly.into(),
            component_capability: Capability::component(),
            components: DashMap::new(),
            extensions: DashMap::new(),
        }
    }

    pub fn contract_assembly(&self) -> &AssemblyId {
        &self.contract_assembly
    }

    /// Concrete types of `assembly` implementing the component contract,
    /// excluding the contract marker itself.
    pub fn components(&self, assembly: &Assembly) -> Arc<Vec<ComponentType>> {
        if let Some(cached) = self.components.get(&assembly.id) {
            tracing::trace!("Component cache hit for {}", assembly.id);
            return cached.clone();
        }

        let resolved = Arc::new(self.implementations(assembly, &self.component_capability));
        self.components
            .entry(assembly.id.clone())
            .or_insert(resolved)
            .clone()
    }

    /// Components of `assembly` that also implement `definition`.
    pub fn view_extensions(
        &self,
        assembly: &Assembly,
        definition: &Capability,
    ) -> Arc<Vec<ComponentType>> {
        let key = (assembly.id.clone(), definition.clone());
        if let Some(cached) = self.extensions.get(&key) {
            return cached.clone();
        }

        let resolved: Vec<_> = self
            .components(assembly)
            .iter()
            .filter(|ty| ty.implements(definition) && !ty.is_marker_of(definition))
            .cloned()
            .collect();
        self.extensions.entry(key).or_insert(Arc::new(resolved)).clone()
    }

    /// Drops every cached result derived from `assembly`.
    pub fn evict(&self, assembly: &AssemblyId) {
        self.components.remove(assembly);
        self.extensions.retain(|(id, _), _| id != assembly);
    }

    fn implementations(&self, assembly: &Assembly, capability: &Capability) -> Vec<ComponentType> {
        assembly
            .types
            .iter()
            .filter(|ty| {
                ty.implements(capability) && ty.is_instantiable() && !ty.is_marker_of(capability)
            })
            .cloned()
            .collect()
    }

    /// Depth-first walk of the reference graph from `entry`, yielding every
    /// assembly that references the contract assembly.
    ///
    /// A branch is pruned as soon as an assembly does not reference the
    /// contract; assemblies the catalog cannot load are skipped. The result is
    /// in preorder.
    pub fn enumerate_component_assemblies(
        &self,
        catalog: &dyn AssemblyCatalog,
        entry: &AssemblyId,
    ) -> Vec<Arc<Assembly>> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        self.walk(catalog, entry, &mut visited, &mut result);
        result
    }

    fn walk(
        &self,
        catalog: &dyn AssemblyCatalog,
        id: &AssemblyId,
        visited: &mut HashSet<AssemblyId>,
        result: &mut Vec<Arc<Assembly>>,
    ) {
        if !visited.insert(id.clone()) {
            return;
        }

        let Some(assembly) = catalog.load(id) else {
            tracing::debug!("Assembly {} not found in catalog, skipping", id);
            return;
        };

        if !assembly.references_assembly(&self.contract_assembly) {
            return;
        }

        result.push(assembly.clone());
        for reference in &assembly.references {
            self.walk(catalog, reference, visited, result);
        }
    }
}
