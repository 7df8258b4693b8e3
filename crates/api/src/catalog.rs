use crate::models::{Assembly, AssemblyId};
use std::sync::Arc;

/// Read access to the host's module loader.
///
/// The core never loads code itself; it only asks the catalog for the
/// metadata of units the host has made available.
pub trait AssemblyCatalog: Send + Sync {
    fn load(&self, id: &AssemblyId) -> Option<Arc<Assembly>>;

    /// All assemblies the catalog knows about, in a stable order.
    fn assemblies(&self) -> Vec<Arc<Assembly>>;
}
