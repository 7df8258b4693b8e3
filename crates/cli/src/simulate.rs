use crate::view::describe;
use modula_api::{AssemblyCatalog, AssemblyId, LoaderContext, NavigationManager, RenderedView};
use modula_core::assembly::InMemoryCatalog;
use modula_core::config::ModulaConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Location the router starts at, relative to the base URI.
    #[serde(default)]
    pub location: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Load an assembly from the catalog into the source.
    Add {
        assembly: AssemblyId,
        /// Register it with its own collectible loader context.
        #[serde(default)]
        collectible: bool,
    },
    Remove {
        assembly: AssemblyId,
    },
    /// External navigation (history, script).
    Navigate {
        uri: String,
    },
    /// Navigation through an intercepted link.
    Click {
        uri: String,
    },
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: Option<Step>,
    location: String,
    views: Vec<RenderedView>,
    reloads: Vec<String>,
}

pub async fn run(
    config: ModulaConfig,
    catalog: InMemoryCatalog,
    entry: Option<String>,
    script: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let script: Script = serde_json::from_str(&std::fs::read_to_string(&script)?)?;
    let host = modula_runtime::build_default_host(
        config,
        catalog,
        entry.map(AssemblyId::from),
        &script.location,
    )
    .await?;

    let mut reloads_seen = 0;
    let mut report = |step: Option<Step>| -> Result<(), Box<dyn std::error::Error>> {
        let reloads = host.navigation.reloads().split_off(reloads_seen);
        reloads_seen += reloads.len();
        let views = host.take_rendered();
        for view in &views {
            info!("{}", describe(view));
        }
        let line = StepReport {
            step,
            location: host.navigation.absolute_uri(),
            views,
            reloads,
        };
        println!("{}", serde_json::to_string(&line)?);
        Ok(())
    };

    report(None)?;
    let mut next_context = 0;
    for step in script.steps {
        match &step {
            Step::Add {
                assembly,
                collectible,
            } => {
                let Some(loaded) = host.catalog.load(assembly) else {
                    return Err(format!("assembly {assembly} is not in the catalog").into());
                };
                let loader = collectible.then(|| {
                    next_context += 1;
                    LoaderContext::collectible(next_context, assembly.as_str())
                });
                host.source.add_assembly(loaded, loader).await?;
            }
            Step::Remove { assembly } => {
                host.source.remove_assembly(assembly).await?;
            }
            Step::Navigate { uri } => host.navigation.navigate_to(uri, false).await,
            Step::Click { uri } => host.navigation.click_link(uri).await,
        }
        report(Some(step))?;
    }

    host.dispose();
    Ok(())
}
