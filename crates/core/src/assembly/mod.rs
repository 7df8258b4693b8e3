pub mod catalog;
pub mod resolver;
pub mod source;

pub use catalog::{CatalogFile, InMemoryCatalog};
pub use resolver::ComponentResolver;
pub use source::{
    AssemblyChange, AssemblyChangeKind, AssemblyEntry, AssemblyListener, AssemblySnapshot,
    AssemblySource,
};
