//! Playground configuration
//!
//! Values are layered: built-in defaults, then a TOML file, then
//! `CODEPAD_*` environment variables, then command-line flags (applied by
//! the binary). Every field has a default, so an empty file is valid.

use padscript::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_STEP_LIMIT, RunOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `step_limit`
pub const ENV_STEP_LIMIT: &str = "CODEPAD_STEP_LIMIT";

/// Environment variable overriding `breakpoint`
pub const ENV_BREAKPOINT: &str = "CODEPAD_BREAKPOINT";

/// Deepest script call nesting a config may ask for
pub const MAX_CALL_DEPTH: usize = 1000;

pub const DEFAULT_INITIAL_CODE: &str = "// Start coding here...";
pub const DEFAULT_PLACEHOLDER: &str = "// Console Output Goes Here";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {name}: {value:?}")]
    Env { name: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaygroundConfig {
    /// Terminal width (columns) at or below which the panes stack vertically
    pub breakpoint: u16,
    pub frame_interval_ms: u64,
    /// Two presses on the divider within this window count as a double-click
    pub double_click_ms: u64,
    pub step_limit: u64,
    pub max_call_depth: usize,
    pub tab_width: usize,
    /// Buffer contents at startup
    pub initial_code: String,
    /// Shown in the console pane while the output log is empty
    pub placeholder: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            breakpoint: 80,
            frame_interval_ms: 16,
            double_click_ms: 300,
            step_limit: DEFAULT_STEP_LIMIT,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            tab_width: 4,
            initial_code: DEFAULT_INITIAL_CODE.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl PlaygroundConfig {
    /// Parse a config from TOML text
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Load the layered configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used only if the file is present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CODEPAD_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_override(ENV_STEP_LIMIT)? {
            self.step_limit = value;
        }
        if let Some(value) = env_override(ENV_BREAKPOINT)? {
            self.breakpoint = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "frame_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.step_limit == 0 {
            return Err(ConfigError::Invalid(
                "step_limit must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_CALL_DEPTH).contains(&self.max_call_depth) {
            return Err(ConfigError::Invalid(format!(
                "max_call_depth must be between 1 and {}",
                MAX_CALL_DEPTH
            )));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            step_limit: self.step_limit,
            max_call_depth: self.max_call_depth,
        }
    }
}

/// `~/.config/codepad/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    home::home_dir().map(|d| d.join(".config/codepad/config.toml"))
}

fn env_override<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { name, value }),
        Err(_) => Ok(None),
    }
}
