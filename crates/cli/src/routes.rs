use crate::view::RouteRow;
use modula_api::AssemblyId;
use modula_core::assembly::InMemoryCatalog;
use modula_core::config::ModulaConfig;
use tabled::{Table, settings::Style};
use tracing::info;

pub async fn run(
    config: ModulaConfig,
    catalog: InMemoryCatalog,
    entry: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host =
        modula_runtime::build_default_host(config, catalog, entry.map(AssemblyId::from), "").await?;

    let Some(table) = host.router.router().route_table().await else {
        return Err("route table was not built".into());
    };
    info!(
        "Route table built from {} assemblies ({} entries)",
        host.source.snapshot().len(),
        table.len()
    );

    if table.is_empty() {
        println!("No routes.");
        return Ok(());
    }
    let rows: Vec<_> = table
        .routes()
        .iter()
        .enumerate()
        .map(|(i, entry)| RouteRow::from_entry(i + 1, entry))
        .collect();
    println!("{}", Table::new(&rows).with(Style::psql()));
    Ok(())
}
