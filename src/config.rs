//! Configuration handling for the kviri CLI
//!
//! Settings are resolved in layers, each overriding the previous one:
//!
//! 1. built-in defaults
//! 2. `kviri.toml` in the working directory, or the file given with `--config`
//! 3. environment variables (a `.env` file in the working directory is loaded first)
//! 4. command-line flags
//!
//! ## Environment Variables
//!
//! - `KVIRI_LOG` - log filter used when `RUST_LOG` is not set
//! - `KVIRI_FORMAT` - output format (`json`, `pretty` or `lines`)
//! - `KVIRI_MAX_BINDINGS` - maximum number of bindings a query may hold

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use kviri_core::QueryLimits;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "kviri.toml";

/// Environment variable names
pub const ENV_LOG: &str = "KVIRI_LOG";
pub const ENV_FORMAT: &str = "KVIRI_FORMAT";
pub const ENV_MAX_BINDINGS: &str = "KVIRI_MAX_BINDINGS";

/// How `kviri run` prints results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON document
    #[default]
    Json,
    /// Colored, human-readable rows
    Pretty,
    /// One compact JSON value per row, group or binding
    Lines,
}

impl FromStr for OutputFormat {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            "lines" => Ok(OutputFormat::Lines),
            other => Err(PlanError::Config(format!(
                "unknown output format '{}' (expected json, pretty or lines)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Json => "json",
            OutputFormat::Pretty => "pretty",
            OutputFormat::Lines => "lines",
        };
        f.write_str(name)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Log filter, in `RUST_LOG` syntax
    pub log: String,
    /// Output format for `kviri run`
    pub format: OutputFormat,
    /// Maximum number of bindings a FROM/JOIN expansion may produce
    pub max_bindings: usize,
    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: "kviri=info".to_string(),
            format: OutputFormat::default(),
            max_bindings: QueryLimits::default().max_bindings,
            source: None,
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist; otherwise `kviri.toml` is read from the
    /// working directory when present. Loads `.env` and applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> PlanResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        // A missing .env is fine
        let _ = dotenvy::dotenv();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::io(path, e))?;
        let mut config = Self::from_toml_str(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> PlanResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) -> PlanResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by variable name. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> PlanResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(log) = lookup(ENV_LOG) {
            self.log = log;
        }

        if let Some(format) = lookup(ENV_FORMAT) {
            self.format = format.parse()?;
        }

        if let Some(max) = lookup(ENV_MAX_BINDINGS) {
            self.max_bindings = parse_max_bindings(&max)?;
        }

        Ok(())
    }

    /// Apply command-line flags, the last layer.
    pub fn apply_cli(
        &mut self,
        log: Option<String>,
        format: Option<OutputFormat>,
        max_bindings: Option<usize>,
    ) {
        if let Some(log) = log {
            self.log = log;
        }
        if let Some(format) = format {
            self.format = format;
        }
        if let Some(max) = max_bindings {
            self.max_bindings = max;
        }
    }

    pub fn limits(&self) -> QueryLimits {
        QueryLimits {
            max_bindings: self.max_bindings,
        }
    }
}

fn parse_max_bindings(value: &str) -> PlanResult<usize> {
    match value.trim().replace('_', "").parse::<usize>() {
        Ok(0) | Err(_) => Err(PlanError::Config(format!(
            "{} must be a positive integer, got '{}'",
            ENV_MAX_BINDINGS, value
        ))),
        Ok(max) => Ok(max),
    }
}
