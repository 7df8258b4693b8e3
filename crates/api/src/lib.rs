pub mod catalog;
pub mod error;
pub mod models;
pub mod module;
pub mod navigation;
pub mod render;

// Re-export commonly used types
pub use catalog::AssemblyCatalog;
pub use error::{ApiError, ApiResult};
pub use models::*;
pub use module::{
    EndPoint, ManifestAssembly, ManifestDispatcher, ModuleId, ModuleManifest, ModuleProperties,
    ModulePropertiesLookup,
};
pub use navigation::{LocationChanged, LocationListener, NavigationManager};
pub use render::{ExtensionView, RenderTarget, RenderedView};
