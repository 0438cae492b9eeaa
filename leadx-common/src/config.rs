//! Configuration loading and write-back
//!
//! Bootstrap configuration comes from a single TOML file. Credentials found
//! here are the lowest-priority source; callers check the environment first.
//!
//! # File resolution
//! 1. Explicit path (command-line `--config`), must exist
//! 2. `<config_dir>/leadx/config.toml` (optional, defaults if missing)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default local model program
pub const DEFAULT_LOCAL_MODEL_PROGRAM: &str = "ollama";

/// Default open-weight model identifier for the local tier
pub const DEFAULT_LOCAL_MODEL: &str = "mistral";

/// Default local model wall-clock budget in seconds
pub const DEFAULT_LOCAL_MODEL_TIMEOUT_SECS: u64 = 30;

/// Default number of records that receive a verbose audit entry
pub const DEFAULT_VERBOSE_RECORDS: usize = 10;

/// Configuration loaded from TOML file
///
/// Every field is optional so a partial (or absent) file still yields a
/// usable configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Geocoding service API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_api_key: Option<String>,

    /// Hosted chat-completion API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Hosted chat-completion model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,

    /// Audit log path override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,

    /// Number of leading records that get a verbose audit entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_records: Option<usize>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Local model invocation
    #[serde(default)]
    pub local_model: LocalModelConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Local model command configuration
///
/// The command line is `program args... model prompt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalModelConfig {
    #[serde(default = "default_local_program")]
    pub program: String,

    #[serde(default = "default_local_args")]
    pub args: Vec<String>,

    #[serde(default = "default_local_model")]
    pub model: String,

    #[serde(default = "default_local_timeout")]
    pub timeout_secs: u64,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            program: default_local_program(),
            args: default_local_args(),
            model: default_local_model(),
            timeout_secs: default_local_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_local_program() -> String {
    DEFAULT_LOCAL_MODEL_PROGRAM.to_string()
}

fn default_local_args() -> Vec<String> {
    vec!["run".to_string()]
}

fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_local_timeout() -> u64 {
    DEFAULT_LOCAL_MODEL_TIMEOUT_SECS
}

impl TomlConfig {
    /// Whether any API key is set in the file
    pub fn holds_api_key(&self) -> bool {
        self.google_maps_api_key.is_some() || self.openai_api_key.is_some()
    }

    /// Verbose record budget, falling back to the built-in default
    pub fn verbose_records(&self) -> usize {
        self.verbose_records.unwrap_or(DEFAULT_VERBOSE_RECORDS)
    }
}

/// Default configuration file path for the platform
///
/// `~/.config/leadx/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("leadx").join("config.toml"))
}

/// Parse a TOML configuration file
///
/// Warns when a file holding API keys is readable by group/other.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    #[cfg(unix)]
    if config.holds_api_key() && check_toml_permissions_loose(path)? {
        warn!(
            "Config file {} holds API keys but is readable by other users; run chmod 600",
            path.display()
        );
    }

    Ok(config)
}

/// Resolve and load configuration
///
/// An explicit path must exist. Without one, the default location is tried
/// and a missing file silently yields `TomlConfig::default()`.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        info!("Loading configuration from {}", path.display());
        return load_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)
        }
        Some(path) => {
            debug!("No config file at {}, using defaults", path.display());
            Ok(TomlConfig::default())
        }
        None => {
            debug!("Could not determine config directory, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write bytes to `target` atomically (temp file + rename)
///
/// The temp file lives next to the target so the rename stays on one
/// filesystem. Parent directories are created as needed.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp = temp_path_for(target);
    {
        let mut file = std::fs::File::create(&temp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    if let Err(e) = std::fs::rename(&temp, target) {
        let _ = std::fs::remove_file(&temp);
        return Err(Error::Io(e));
    }
    Ok(())
}

/// Write configuration to TOML file atomically
///
/// The file may hold API keys, so on Unix it is restricted to 0600.
pub fn write_toml_config(config: &TomlConfig, target: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    write_atomic(target, content.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(target, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Check whether a config file is readable by group/other
///
/// Returns true if permissions are looser than 0600.
#[cfg(unix)]
pub fn check_toml_permissions_loose(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o077 != 0)
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}
