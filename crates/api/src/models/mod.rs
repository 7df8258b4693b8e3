pub mod assembly;
pub mod component;
pub mod listener;
pub mod route;

pub use assembly::*;
pub use component::*;
pub use listener::*;
pub use route::*;
