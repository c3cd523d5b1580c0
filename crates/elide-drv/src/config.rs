//! Configuration for the elide driver.
//!
//! Settings come from, in increasing priority: `ELIDE_*` environment
//! variables, a TOML file (`--config` or `elide.toml` in the current
//! directory), and command-line flags. A key the file leaves out keeps its
//! environment value.

use elide_opt::{ElisionConfig, ElisionMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{DriverError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "elide.toml";

/// Effective driver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Print JSON reports by default.
    pub json: bool,

    /// Pass settings.
    pub elision: ElisionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            json: false,
            elision: ElisionConfig::from_env(),
        }
    }
}

/// Configuration file contents.
///
/// ```toml
/// json = false
///
/// [elision]
/// mode = "dominators"
/// write_implies_read = true
///
/// [elision.survives_safepoint]
/// read = true
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    json: Option<bool>,
    elision: Option<ElisionTable>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ElisionTable {
    survives_safepoint: Option<SurvivalTable>,
    write_implies_read: Option<bool>,
    elide_fresh_allocations: Option<bool>,
    mode: Option<ElisionMode>,
    verify: Option<bool>,
    max_rounds: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SurvivalTable {
    read: Option<bool>,
    write: Option<bool>,
}

impl ConfigFile {
    fn apply(self, mut config: Config) -> Config {
        if let Some(json) = self.json {
            config.json = json;
        }
        if let Some(table) = self.elision {
            table.apply(&mut config.elision);
        }
        config
    }
}

impl ElisionTable {
    fn apply(self, elision: &mut ElisionConfig) {
        if let Some(survival) = self.survives_safepoint {
            if let Some(read) = survival.read {
                elision.survives_safepoint.read = read;
            }
            if let Some(write) = survival.write {
                elision.survives_safepoint.write = write;
            }
        }
        if let Some(flag) = self.write_implies_read {
            elision.write_implies_read = flag;
        }
        if let Some(flag) = self.elide_fresh_allocations {
            elision.elide_fresh_allocations = flag;
        }
        if let Some(mode) = self.mode {
            elision.mode = mode;
        }
        if let Some(flag) = self.verify {
            elision.verify = flag;
        }
        if let Some(rounds) = self.max_rounds {
            elision.max_rounds = rounds;
        }
    }
}

impl Config {
    /// Load from `path` if given, else from `elide.toml` in the current
    /// directory, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => match Self::check_current_dir_config() {
                Some(path) => Self::load_from_path(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DriverError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse file contents over the environment defaults.
    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_over(content, Self::default())
    }

    /// Parse file contents over `base`; keys the file omits keep their
    /// value from `base`.
    pub fn parse_over(content: &str, base: Config) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| DriverError::Config(format!("Failed to parse configuration: {}", e)))?;
        let config = file.apply(base);
        config
            .elision
            .validate()
            .map_err(|e| DriverError::Config(e.to_string()))?;
        Ok(config)
    }

    fn check_current_dir_config() -> Option<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }
}
