pub mod placeholder;

pub use placeholder::{PlaceholderParameters, ViewExtensionPlaceholder};
