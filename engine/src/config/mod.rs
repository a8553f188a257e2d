//! Configuration management
//!
//! This module handles loading, validation, and management of the engine
//! settings. Settings are stored in TOML format at ~/.agrocrew/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, optional progress log file
//! - **crew**: Agents and tasks documents, unknown tool policy
//! - **tools**: Built-in tool settings (search, advice, results) and
//!   external classifier commands
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Resolves relative crew document paths against the config file's directory
//!
//! # Examples
//!
//! ```no_run
//! use agrocrew_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! println!("Log level: {}", config.core.log_level);
//! println!("Tasks: {:?}", config.crew.tasks);
//! # Ok(())
//! # }
//! ```

use crew_sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::crew::UnknownToolPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Crew documents and dispatch policy
    #[serde(default)]
    pub crew: CrewConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON-lines file receiving one progress event per task (supports ~ expansion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_log: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            progress_log: None,
        }
    }
}

/// Crew documents configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrewConfig {
    /// Agents document (YAML, TOML or JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<PathBuf>,

    /// Tasks document (YAML, TOML or JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<PathBuf>,

    /// Behaviour when a task names an unregistered tool
    #[serde(default)]
    pub unknown_tool: UnknownToolPolicy,
}

/// Built-in tools configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Web search advice tool
    #[serde(default)]
    pub search: SearchConfig,

    /// Fixed advice lookup table
    #[serde(default)]
    pub advice: AdviceConfig,

    /// JSON results log
    #[serde(default)]
    pub results: ResultsConfig,

    /// External classifier commands, one tool each
    #[serde(default)]
    pub command: Vec<CommandToolConfig>,
}

/// Web search tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the instant-answer API
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// HTTP timeout (seconds)
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Appended to every label before searching
    #[serde(default)]
    pub query_suffix: String,

    /// Returned instead of searching when a label is healthy
    #[serde(default = "default_healthy_message")]
    pub healthy_message: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_search_base_url(),
            timeout_secs: default_search_timeout(),
            query_suffix: String::new(),
            healthy_message: default_healthy_message(),
        }
    }
}

/// Advice lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Text returned for labels missing from the table
    #[serde(default = "default_advice_fallback")]
    pub fallback: String,

    /// Extra or replacement entries, label to advice
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback: default_advice_fallback(),
            entries: BTreeMap::new(),
        }
    }
}

/// Results log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON array file receiving one entry per call (supports ~ expansion)
    #[serde(default = "default_results_path")]
    pub path: PathBuf,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_results_path(),
        }
    }
}

/// An external classifier exposed as a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandToolConfig {
    /// Tool name used in task documents
    pub name: String,

    /// Program to run; the image path is appended to `args`
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Prediction field receiving the classifier's label
    #[serde(default = "default_label_field")]
    pub label_field: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_search_base_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_search_timeout() -> u64 {
    15
}

fn default_healthy_message() -> String {
    "No treatment needed. The crop is healthy.".to_string()
}

fn default_advice_fallback() -> String {
    "No advice available for this result. Please consult a local agricultural expert."
        .to_string()
}

fn default_results_path() -> PathBuf {
    PathBuf::from("~/.agrocrew/results.json")
}

fn default_label_field() -> String {
    "label".to_string()
}

impl Config {
    /// Load configuration from the default location (~/.agrocrew/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// Relative paths (crew documents, results log, progress log) are
    /// resolved against the directory holding the configuration file.
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_toml_str(&contents)?;

        if let Some(base) = path.parent() {
            config.crew.agents = config.crew.agents.map(|p| relative_to(base, p));
            config.crew.tasks = config.crew.tasks.map(|p| relative_to(base, p));
            config.core.progress_log = config.core.progress_log.map(|p| relative_to(base, p));
            config.tools.results.path = relative_to(base, config.tools.results.path);
        }

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.agrocrew/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".agrocrew").join("config.toml"))
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level
    /// - Validates search and command tool settings
    /// - Expands ~ in paths
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.tools.search.timeout_secs == 0 {
            return Err(EngineError::Config(
                "tools.search.timeout_secs must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for command in &self.tools.command {
            if command.name.trim().is_empty() {
                return Err(EngineError::Config(
                    "tools.command entries need a non-empty name".to_string(),
                ));
            }
            if command.program.trim().is_empty() {
                return Err(EngineError::Config(format!(
                    "Command tool '{}' has an empty program",
                    command.name
                )));
            }
            if !seen.insert(command.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "Command tool '{}' is declared twice",
                    command.name
                )));
            }
        }

        self.tools.results.path = expand_path(&self.tools.results.path)?;
        if let Some(progress_log) = &self.core.progress_log {
            self.core.progress_log = Some(expand_path(progress_log)?);
        }
        if let Some(agents) = &self.crew.agents {
            self.crew.agents = Some(expand_path(agents)?);
        }
        if let Some(tasks) = &self.crew.tasks {
            self.crew.tasks = Some(expand_path(tasks)?);
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn relative_to(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}
