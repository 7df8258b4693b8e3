use crate::ApiResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ModuleId(SmolStr);

impl ModuleId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a running module instance on the message bus.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct EndPoint(pub SmolStr);

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleProperties {
    pub end_points: Vec<EndPoint>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestAssembly {
    pub assembly_name: String,
    pub assembly_version: String,
    pub is_component_assembly: bool,
}

/// The set of assemblies a remote module contributes to the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModuleManifest {
    pub name: String,
    #[serde(default)]
    pub assemblies: Vec<ManifestAssembly>,
}

impl ModuleManifest {
    pub fn component_assemblies(&self) -> impl Iterator<Item = &ManifestAssembly> {
        self.assemblies.iter().filter(|a| a.is_component_assembly)
    }
}

#[async_trait]
pub trait ModulePropertiesLookup: Send + Sync {
    async fn lookup(&self, module: &ModuleId) -> ApiResult<Option<ModuleProperties>>;
}

/// Queries a module manifest from a single end point.
///
/// `Ok(None)` means the end point answered without a manifest.
#[async_trait]
pub trait ManifestDispatcher: Send + Sync {
    async fn query_manifest(
        &self,
        end_point: &EndPoint,
        module: &ModuleId,
    ) -> ApiResult<Option<ModuleManifest>>;
}
