//! Configuration management for matquery
//!
//! TOML file, default location ~/.matquery/config.toml. Every section is
//! optional; missing values fall back to built-in defaults. The config is
//! built once at startup and handed to components by reference.

use crate::errors::{ResolveError, Result};
use crate::ranking::RankConfig;
use crate::registry::{builtin_descriptors, DatabaseDescriptor, DatabaseRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default number of returned structures
pub const DEFAULT_N_RESULTS: usize = 5;

/// Hard upper bound on returned structures
pub const MAX_N_RESULTS: usize = 20;

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub ranking: RankConfig,
    pub databases: Vec<DatabaseDescriptor>,
}

/// Language model connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "deepseek" | "openai" | anything else with `api_base` set
    pub provider: String,
    pub model: String,
    pub api_base: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Resolved key; never written back to disk
    #[serde(skip)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

/// Fan-out and degradation behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Deadline for the whole backend fan-out
    pub deadline_ms: u64,
    /// Relaxation steps per backend before giving up
    pub max_relaxation_steps: u32,
    pub default_n_results: usize,
    /// Cap on routed backends; unset means all qualifying backends
    pub max_backends: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            ranking: RankConfig::default(),
            databases: builtin_descriptors(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            api_base: None,
            api_key_env: "LLM_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 30,
            temperature: 0.2,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 30_000,
            max_relaxation_steps: 3,
            default_n_results: DEFAULT_N_RESULTS,
            max_backends: None,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ResolveError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// ~/.matquery/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".matquery").join("config.toml"))
    }

    /// Resolve the API key from the configured environment variable
    pub fn with_api_key_from_env(mut self) -> Self {
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var(&self.llm.api_key_env)
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty());
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.search.deadline_ms == 0 {
            return Err(ResolveError::ConfigError(
                "deadline_ms must be greater than 0".to_string(),
            ));
        }

        if !(1..=MAX_N_RESULTS).contains(&self.search.default_n_results) {
            return Err(ResolveError::ConfigError(format!(
                "default_n_results must be between 1 and {}",
                MAX_N_RESULTS
            )));
        }

        if self.search.max_backends == Some(0) {
            return Err(ResolveError::ConfigError(
                "max_backends must be greater than 0 when set".to_string(),
            ));
        }

        self.ranking.validate()?;

        let mut ids = HashSet::new();
        for db in &self.databases {
            if !ids.insert(db.id.as_str()) {
                return Err(ResolveError::ConfigError(format!(
                    "duplicate database id: {}",
                    db.id
                )));
            }
        }

        Ok(())
    }

    /// Build the read-only database registry
    pub fn registry(&self) -> Result<DatabaseRegistry> {
        DatabaseRegistry::new(self.databases.clone())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ResolveError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ResolveError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ResolveError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

/// Clamp a requested result count into [1, MAX_N_RESULTS]
///
/// Zero falls back to `default`.
pub fn normalize_n_results(requested: usize, default: usize) -> usize {
    if requested == 0 {
        default.clamp(1, MAX_N_RESULTS)
    } else {
        requested.min(MAX_N_RESULTS)
    }
}
