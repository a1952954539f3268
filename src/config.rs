//! Configuration System
//!
//! TOML configuration for the daemon: which directories to scan for template
//! sources, where the group table lives, how to reach the control plane, and
//! logging settings. Loaded once at startup and validated eagerly.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EtcgenConfig {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Variables available to template renderers
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Daemon-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directories scanned for template sources and plugins.
    /// Scan order is precedence order: the first directory wins on
    /// duplicate logical names.
    #[serde(default)]
    pub plugin_dirs: Vec<PathBuf>,

    /// Group table file
    #[serde(default = "default_groups_file")]
    pub groups_file: PathBuf,

    /// Control-plane endpoint (Unix domain socket)
    #[serde(default = "default_socket")]
    pub socket: PathBuf,

    /// Touched once the daemon is connected and the initial generation has
    /// completed; consumed by an external process supervisor.
    #[serde(default)]
    pub ready_file: Option<PathBuf>,
}

fn default_groups_file() -> PathBuf {
    PathBuf::from("/usr/local/etc/etcgen/groups.toml")
}

fn default_socket() -> PathBuf {
    PathBuf::from("/var/run/etcgen.sock")
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            plugin_dirs: Vec::new(),
            groups_file: default_groups_file(),
            socket: default_socket(),
            ready_file: None,
        }
    }
}

impl EtcgenConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EtcgenConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.plugin_dirs.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one plugin directory must be configured".to_string(),
            ));
        }
        for dir in &self.daemon.plugin_dirs {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "plugin directory path cannot be empty".to_string(),
                ));
            }
        }
        if self.daemon.groups_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "groups file path cannot be empty".to_string(),
            ));
        }
        if self.daemon.socket.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "control-plane socket path cannot be empty".to_string(),
            ));
        }
        self.logging.validate()?;
        Ok(())
    }
}
