use modula_api::{AssemblyId, ModuleId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModulaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Route template configuration errors. Fatal at table-build time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Invalid template '{template}'. {reason}")]
    MalformedTemplate { template: String, reason: String },
    #[error("Unsupported constraint '{constraint}' in route '{template}'.")]
    UnsupportedConstraint { template: String, constraint: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("The route table has not been built yet")]
    NotInitialized,
    #[error("The type {type_name} does not implement the component contract")]
    InvalidHandlerType { type_name: String },
    #[error("Cannot set the render handle of a component multiple times")]
    AlreadyAttached,
    #[error("The router is not attached to a render handle")]
    NotAttached,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Assembly source mutated from its own change notification (assembly {0})")]
    ReentrantMutation(AssemblyId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("The notification manager has been disposed")]
    Disposed,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("An edit form requires a model or an edit context, but not both")]
    MissingModel,
    #[error("Unknown form extension registration {0}")]
    UnknownRegistration(u64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("Unable to load manifest for {module}. {reason}")]
    ManifestUnavailable { module: ModuleId, reason: String },
    #[error("Assembly {assembly} listed by module {module} is not available")]
    AssemblyNotFound { module: ModuleId, assembly: String },
    #[error("Module {0} is already installed")]
    AlreadyInstalled(ModuleId),
    #[error("Module {0} is not installed")]
    NotInstalled(ModuleId),
    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ModulaError>;
