//! Host configuration, loaded from a JSON file.
//!
//! Every field has a default so an empty object (or no file at all) yields a
//! working configuration.

use crate::error::Result;
use crate::routing::LiteralComparison;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModulaConfig {
    pub router: RouterConfig,
    pub resolver: ResolverConfig,
    pub modules: ModulesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Full type name of the component rendered when no route matches.
    pub fallback: Option<String>,
    pub literal_comparison: LiteralComparison,
    pub base_uri: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            fallback: None,
            literal_comparison: LiteralComparison::Ordinal,
            base_uri: "http://localhost/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Assembly defining the component contract. Assemblies not referencing
    /// it are pruned from the transitive walk.
    pub contract_assembly: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            contract_assembly: "Components".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModulesConfig {
    pub bypass_manifest_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Defaults to `~/.modula/logs`.
    pub directory: Option<PathBuf>,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            level: "info".to_string(),
        }
    }
}

impl ModulaConfig {
    /// Loads the configuration at `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "router": {{ "fallback": "App.NotFound", "literal_comparison": "ignore_case" }} }}"#
        )
        .unwrap();

        let config = ModulaConfig::load(file.path()).unwrap();
        assert_eq!(config.router.fallback.as_deref(), Some("App.NotFound"));
        assert_eq!(config.router.literal_comparison, LiteralComparison::IgnoreCase);
        assert_eq!(config.router.base_uri, "http://localhost/");
        assert_eq!(config.resolver.contract_assembly, "Components");
        assert!(!config.modules.bypass_manifest_cache);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_logging_section() {
        let config: ModulaConfig = serde_json::from_str(
            r#"{ "logging": { "directory": "/var/log/modula", "level": "modula_core=debug" } }"#,
        )
        .unwrap();
        assert_eq!(
            config.logging.directory.as_deref(),
            Some(Path::new("/var/log/modula"))
        );
        assert_eq!(config.logging.level, "modula_core=debug");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModulaConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ModulaConfig::default());
    }
}
