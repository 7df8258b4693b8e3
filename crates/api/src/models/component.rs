use super::assembly::AssemblyId;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A capability marker, named by the fully qualified name of its marker type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Capability(SmolStr);

impl Capability {
    /// Marker of the framework's component contract.
    pub const COMPONENT: &'static str = "Components.IComponent";

    pub fn new(marker: impl AsRef<str>) -> Self {
        Self(SmolStr::new(marker.as_ref()))
    }

    pub fn component() -> Self {
        Self::new(Self::COMPONENT)
    }

    pub fn marker(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Abstract,
    Interface,
}

/// An exported type of an assembly.
///
/// Identity is `(assembly, name)`; capabilities and route templates are
/// metadata and do not take part in equality.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ComponentType {
    pub name: SmolStr,
    pub assembly: AssemblyId,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    /// Route templates attached to the type.
    #[serde(default)]
    pub routes: Vec<SmolStr>,
}

impl ComponentType {
    pub fn new(assembly: impl Into<AssemblyId>, name: impl AsRef<str>) -> Self {
        Self {
            name: SmolStr::new(name.as_ref()),
            assembly: assembly.into(),
            kind: TypeKind::Class,
            capabilities: BTreeSet::new(),
            routes: Vec::new(),
        }
    }

    /// Shorthand for a concrete type implementing the component contract.
    pub fn component(assembly: impl Into<AssemblyId>, name: impl AsRef<str>) -> Self {
        Self::new(assembly, name).with_capability(Capability::component())
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_route(mut self, template: impl AsRef<str>) -> Self {
        self.routes.push(SmolStr::new(template.as_ref()));
        self
    }

    pub fn implements(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Whether this type is the marker type of `capability` itself.
    pub fn is_marker_of(&self, capability: &Capability) -> bool {
        self.name.as_str() == capability.marker()
    }

    pub fn is_instantiable(&self) -> bool {
        self.kind == TypeKind::Class
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.assembly == other.assembly && self.name == other.name
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.assembly.hash(state);
        self.name.hash(state);
    }
}

impl PartialOrd for ComponentType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.assembly
            .cmp(&other.assembly)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.name, self.assembly)
    }
}
