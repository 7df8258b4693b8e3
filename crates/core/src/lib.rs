pub mod error;
pub mod logging;

pub mod assembly;
pub mod config;
pub mod extensibility;
pub mod forms;
pub mod modules;
pub mod navigation;
pub mod notifications;
pub mod reactive;
pub mod render;
pub mod routing;

pub use error::{ModulaError, Result};
