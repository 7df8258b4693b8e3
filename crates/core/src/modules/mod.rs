//! Remote modules: manifest retrieval and installing a module's assemblies.

pub mod directory;
pub mod host;
pub mod manifest;
pub mod provider;

pub use directory::InMemoryModuleDirectory;
pub use host::ModuleHost;
pub use manifest::build_manifest;
pub use provider::ModuleManifestProvider;
