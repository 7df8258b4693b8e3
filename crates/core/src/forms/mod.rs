//! Edit forms whose validation and submission can be extended by plugins.

pub mod context;
pub mod extensible;
pub mod form;

pub use context::{EditContext, FnValidator, ValidationMessage, Validator};
pub use extensible::{ExtensibleEditContext, FormExtensionRegistration};
pub use form::{EditFormExtension, ExtensibleEditForm, FnSubmitHandler, SubmitHandler};
