use crate::view::ManifestRow;
use modula_api::{AssemblyCatalog, AssemblyId};
use modula_core::assembly::InMemoryCatalog;
use modula_core::config::ModulaConfig;
use modula_core::modules::build_manifest;
use tabled::{Table, settings::Style};

pub fn run(
    config: &ModulaConfig,
    catalog: &InMemoryCatalog,
    name: Option<String>,
    assemblies: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = assemblies
        .iter()
        .map(|id| {
            catalog
                .load(&AssemblyId::new(id))
                .ok_or_else(|| format!("assembly {id} is not in the catalog"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let name = name
        .or_else(|| assemblies.first().cloned())
        .unwrap_or_default();
    let contract = AssemblyId::new(&config.resolver.contract_assembly);
    let manifest = build_manifest(&name, &loaded, &contract);

    let rows: Vec<ManifestRow> = manifest.assemblies.iter().map(ManifestRow::from).collect();
    tracing::info!(
        "Manifest {}:\n{}",
        manifest.name,
        Table::new(&rows).with(Style::psql())
    );
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}
