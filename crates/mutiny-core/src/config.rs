//! Configuration loading and typed config structures for the Mutiny server.
//!
//! The canonical configuration lives in `mutiny-config.yaml` at the project
//! root. Every field has a default, so an empty file (or no file at all)
//! yields a working configuration. Network and output settings can be
//! overridden through environment variables.

use std::path::{Path, PathBuf};

use mutiny_world::{ScenarioError, ScenarioSpec, default_scenario};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `mutiny-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Network listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Run bounds and output.
    #[serde(default)]
    pub run: RunConfig,

    /// Starting world.
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file, then apply env overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override settings with `MUTINY_HOST`, `MUTINY_PORT`, and
    /// `MUTINY_RESULTS_DIR` when set. An unparsable port is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MUTINY_HOST") {
            self.server.host = val;
        }
        if let Some(port) = std::env::var("MUTINY_PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("MUTINY_RESULTS_DIR") {
            self.run.results_dir = PathBuf::from(val);
        }
    }

    /// The configured scenario, or the built-in default.
    pub fn load_scenario(&self) -> Result<ScenarioSpec, ScenarioError> {
        match &self.scenario.path {
            Some(path) => ScenarioSpec::from_file(path),
            None => Ok(default_scenario()),
        }
    }
}

/// Network listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind. Zero picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long a connection may take to deliver one frame.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Interval between periodic termination checks.
    #[serde(default = "default_termination_check_ms")]
    pub termination_check_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout_ms: default_read_timeout_ms(),
            termination_check_ms: default_termination_check_ms(),
        }
    }
}

/// Run bounds and output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Wall-clock time limit for one run.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u64,

    /// Directory receiving `<run-id>.json` result records.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: default_time_limit_secs(),
            results_dir: default_results_dir(),
        }
    }
}

/// Starting world selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Path to a scenario YAML file. The built-in map is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_host() -> String {
    String::from("127.0.0.1")
}

const fn default_port() -> u16 {
    6000
}

const fn default_read_timeout_ms() -> u64 {
    5_000
}

const fn default_termination_check_ms() -> u64 {
    500
}

const fn default_time_limit_secs() -> u64 {
    300
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}
