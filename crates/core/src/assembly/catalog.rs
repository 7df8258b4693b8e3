use crate::error::Result;
use modula_api::{Assembly, AssemblyCatalog, AssemblyId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// On-disk form of a catalog: an entry assembly plus the assembly metadata.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CatalogFile {
    #[serde(default)]
    pub entry: Option<AssemblyId>,
    #[serde(default)]
    pub assemblies: Vec<Assembly>,
}

/// Assembly catalog backed by a map, standing in for the host's module loader.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    entry: Option<AssemblyId>,
    assemblies: HashMap<AssemblyId, Arc<Assembly>>,
}

impl InMemoryCatalog {
    pub fn new(assemblies: impl IntoIterator<Item = Assembly>) -> Self {
        let mut catalog = Self::default();
        for assembly in assemblies {
            catalog.insert(assembly);
        }
        catalog
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)?;
        let mut catalog = Self::new(file.assemblies);
        catalog.entry = file.entry;
        Ok(catalog)
    }

    /// Inserts or replaces an assembly.
    pub fn insert(&mut self, assembly: Assembly) {
        self.assemblies
            .insert(assembly.id.clone(), Arc::new(assembly));
    }

    pub fn with_entry(mut self, entry: impl Into<AssemblyId>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    pub fn entry(&self) -> Option<&AssemblyId> {
        self.entry.as_ref()
    }
}

impl AssemblyCatalog for InMemoryCatalog {
    fn load(&self, id: &AssemblyId) -> Option<Arc<Assembly>> {
        self.assemblies.get(id).cloned()
    }

    fn assemblies(&self) -> Vec<Arc<Assembly>> {
        let mut all: Vec<_> = self.assemblies.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}
