//! Configuration for studybuddy.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::StudyResult;
use crate::generation::CommandGenerator;

pub const CONFIG_FILE_NAME: &str = "studybuddy.toml";
const DEFAULT_DB_NAME: &str = "studybuddy.db";

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path. Defaults to the user config directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// How long a writer waits for the lock before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Owner id used when neither `--user` nor `STUDYBUDDY_USER` is set.
    #[serde(default)]
    pub user: Option<String>,
}

/// External command used to generate flashcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_command")]
    pub command: String,

    #[serde(default = "default_generation_args")]
    pub args: Vec<String>,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            command: default_generation_command(),
            args: default_generation_args(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_generation_command() -> String {
    "claude".to_string()
}

// Print mode: read the prompt from stdin, reply once, exit
fn default_generation_args() -> Vec<String> {
    vec!["-p".to_string()]
}

fn default_generation_timeout() -> u64 {
    120
}

impl GenerationConfig {
    pub fn generator(&self) -> CommandGenerator {
        CommandGenerator::new(
            self.command.clone(),
            self.args.clone(),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> StudyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> StudyResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads `path` if it exists, otherwise the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> StudyResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// `STUDYBUDDY_DB` wins over the config file, which wins over the default location.
    pub fn db_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("STUDYBUDDY_DB") {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        config_dir().join(DEFAULT_DB_NAME)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studybuddy")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}
