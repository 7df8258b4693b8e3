use modula_api::{Assembly, AssemblyId, ManifestAssembly, ModuleManifest};
use std::sync::Arc;

const UNVERSIONED: &str = "0.0.0";

/// Describes `assemblies` as the manifest a module serves to clients.
///
/// An assembly is flagged as a component assembly when it references the
/// contract assembly.
pub fn build_manifest(
    name: &str,
    assemblies: &[Arc<Assembly>],
    contract_assembly: &AssemblyId,
) -> ModuleManifest {
    ModuleManifest {
        name: name.to_string(),
        assemblies: assemblies
            .iter()
            .map(|assembly| ManifestAssembly {
                assembly_name: assembly.id.to_string(),
                assembly_version: assembly
                    .version
                    .as_deref()
                    .unwrap_or(UNVERSIONED)
                    .to_string(),
                is_component_assembly: assembly.references_assembly(contract_assembly),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_flags_component_assemblies() {
        let assemblies = vec![
            Arc::new(Assembly::new("Shop.Ui").with_version("1.2.0").with_reference("Components")),
            Arc::new(Assembly::new("Shop.Model")),
        ];
        let manifest = build_manifest("Shop", &assemblies, &"Components".into());

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["assemblies"][0]["assemblyName"], "Shop.Ui");
        assert_eq!(json["assemblies"][0]["assemblyVersion"], "1.2.0");
        assert_eq!(json["assemblies"][0]["isComponentAssembly"], true);
        assert_eq!(json["assemblies"][1]["assemblyVersion"], "0.0.0");
        assert_eq!(manifest.component_assemblies().count(), 1);
    }
}
