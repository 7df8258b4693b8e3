use super::component::ComponentType;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Stable identity of a loadable unit of code.
///
/// Two assemblies are the same assembly if and only if their identities are
/// equal. A host that reloads a plugin under the same name must either keep
/// the component set identical or give it a new (e.g. versioned) identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AssemblyId(SmolStr);

impl AssemblyId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssemblyId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssemblyId {
    fn from(value: String) -> Self {
        Self(SmolStr::from(value))
    }
}

/// Metadata of a loaded assembly: what it references and what it exports.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub id: AssemblyId,
    #[serde(default)]
    pub version: Option<SmolStr>,
    #[serde(default)]
    pub references: Vec<AssemblyId>,
    #[serde(default)]
    pub types: Vec<ComponentType>,
}

impl Assembly {
    pub fn new(id: impl Into<AssemblyId>) -> Self {
        Self {
            id: id.into(),
            version: None,
            references: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl AsRef<str>) -> Self {
        self.version = Some(SmolStr::new(version.as_ref()));
        self
    }

    pub fn with_reference(mut self, reference: impl Into<AssemblyId>) -> Self {
        self.references.push(reference.into());
        self
    }

    pub fn with_type(mut self, ty: ComponentType) -> Self {
        self.types.push(ty);
        self
    }

    pub fn references_assembly(&self, id: &AssemblyId) -> bool {
        self.references.iter().any(|r| r == id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct LoaderContextId(pub u64);

impl fmt::Display for LoaderContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alc#{}", self.0)
    }
}

/// The loading scope an assembly was produced by.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderContext {
    pub id: LoaderContextId,
    pub name: SmolStr,
    /// Whether the scope (and every assembly in it) can be unloaded.
    pub collectible: bool,
}

impl LoaderContext {
    pub fn new(id: u64, name: impl AsRef<str>, collectible: bool) -> Self {
        Self {
            id: LoaderContextId(id),
            name: SmolStr::new(name.as_ref()),
            collectible,
        }
    }

    pub fn collectible(id: u64, name: impl AsRef<str>) -> Self {
        Self::new(id, name, true)
    }
}
