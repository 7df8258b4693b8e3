use modula_api::AssemblyId;
use modula_core::assembly::InMemoryCatalog;
use modula_core::config::ModulaConfig;

pub async fn run(
    config: ModulaConfig,
    catalog: InMemoryCatalog,
    entry: Option<String>,
    path: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let host =
        modula_runtime::build_default_host(config, catalog, entry.map(AssemblyId::from), "").await?;
    let Some(table) = host.router.router().route_table().await else {
        return Err("route table was not built".into());
    };

    let relative = path.trim_start_matches('/');
    let relative = match relative.find(['?', '#']) {
        Some(end) => &relative[..end],
        None => relative,
    };
    let matched = table.match_path(relative);
    if matched.is_none() {
        tracing::info!("No route matches '{}'", relative);
    }
    println!("{}", serde_json::to_string_pretty(&matched)?);
    Ok(())
}
