mod manifest;
mod matching;
mod routes;
mod simulate;
mod view;

use clap::{Parser, Subcommand};
use modula_core::assembly::InMemoryCatalog;
use modula_core::config::ModulaConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "modula",
    version,
    about = "Inspect and exercise module-aware component routing",
    long_about = "Modula builds route tables from the component assemblies of a JSON catalog and \
                  replays assembly load/unload and navigation sequences against a modular router, \
                  showing what would be rendered at every step."
)]
pub struct Cli {
    /// JSON configuration file; defaults apply to every missing field
    #[arg(long, global = true, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to stderr
    #[arg(long, global = true)]
    pub log_stderr: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the route table built from a catalog
    Routes {
        /// Assembly catalog (JSON)
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        /// Entry assembly; defaults to the catalog's entry
        #[arg(long)]
        entry: Option<String>,
    },
    /// Match a path against the route table and print the result as JSON
    Match {
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(long)]
        entry: Option<String>,
        /// Base-relative path, e.g. `users/42`
        path: String,
    },
    /// Replay a script of assembly and navigation steps
    #[command(
        long_about = "Runs a JSON script of steps (add, remove, navigate, click) against a modular \
                      router seeded from the catalog and prints the views rendered by each step."
    )]
    Simulate {
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        #[arg(long)]
        entry: Option<String>,
        /// Script file (JSON)
        #[arg(long, value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Print the module manifest describing the given assemblies
    Manifest {
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
        /// Module name; defaults to the first assembly
        #[arg(long)]
        name: Option<String>,
        #[arg(required = true, value_name = "ASSEMBLY")]
        assemblies: Vec<String>,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ModulaConfig::load_or_default(cli.config.as_deref())?;
    let _guard = modula_runtime::init_logging("cli", &config, cli.log_stderr);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Routes { catalog, entry } => {
            rt.block_on(routes::run(config, load_catalog(&catalog)?, entry))
        }
        Commands::Match {
            catalog,
            entry,
            path,
        } => rt.block_on(matching::run(config, load_catalog(&catalog)?, entry, path)),
        Commands::Simulate {
            catalog,
            entry,
            script,
        } => rt.block_on(simulate::run(config, load_catalog(&catalog)?, entry, script)),
        Commands::Manifest {
            catalog,
            name,
            assemblies,
        } => manifest::run(&config, &load_catalog(&catalog)?, name, assemblies),
    }
}

fn load_catalog(path: &Path) -> Result<InMemoryCatalog, Box<dyn std::error::Error>> {
    tracing::debug!("Loading catalog from {}", path.display());
    Ok(InMemoryCatalog::load_file(path)?)
}
