//! Configuration loading and resolution
//!
//! Configuration file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MOTHRA_CONFIG`)
//! 3. User config file (`~/.config/mothra/config.toml`, then `/etc/mothra/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable file never aborts startup: a warning is logged and the
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MOTHRA_CONFIG";

/// Environment variable overriding `public_files_root`
pub const PUBLIC_FILES_ENV_VAR: &str = "MOTHRA_PUBLIC_FILES";

/// Default SDM web service endpoint
pub const DEFAULT_SDM_ENDPOINT: &str = "http://vihar.ijs.si:8097";

/// SDM requests run whole inductions remotely, so the client waits up to an hour
pub const DEFAULT_SDM_TIMEOUT_SECS: u64 = 3600;

/// Top-level configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MothraConfig {
    /// Directory under which converters publish downloadable files
    pub public_files_root: PathBuf,

    /// Database holding the `auth_user` table (statistics command)
    pub database_url: Option<String>,

    /// Bind address of the workflow service
    pub bind_address: String,

    pub logging: LoggingConfig,

    pub engines: EngineConfig,

    pub sdm: SdmConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
}

/// Locations of the external ILP engines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Prolog interpreter used for Aleph and RSD
    pub prolog: String,
    /// Java runtime used for TreeLiker and Proper
    pub java: String,
    /// Aleph source file consulted by the generated driver
    pub aleph: PathBuf,
    /// RSD source file consulted by the generated driver
    pub rsd: PathBuf,
    pub treeliker: PathBuf,
    pub proper: PathBuf,
    pub onebc: PathBuf,
    pub tertius: PathBuf,
}

/// SDM-Aleph web service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SdmConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for MothraConfig {
    fn default() -> Self {
        Self {
            public_files_root: default_public_files_root(),
            database_url: None,
            bind_address: "127.0.0.1:5740".to_string(),
            logging: LoggingConfig::default(),
            engines: EngineConfig::default(),
            sdm: SdmConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let base = PathBuf::from("/opt/mothra/ilp");
        Self {
            prolog: "yap".to_string(),
            java: "java".to_string(),
            aleph: base.join("aleph.pl"),
            rsd: base.join("rsd.pl"),
            treeliker: base.join("treeliker.jar"),
            proper: base.join("proper.jar"),
            onebc: base.join("1BC"),
            tertius: base.join("tertius"),
        }
    }
}

impl Default for SdmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SDM_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_SDM_TIMEOUT_SECS,
        }
    }
}

impl MothraConfig {
    /// Parse configuration from TOML text; absent keys take compiled defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from an explicit file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration following the priority order above,
    /// then apply environment overrides.
    pub fn resolve(cli_path: Option<&Path>) -> Self {
        let mut config = match locate_config_file(cli_path) {
            Some(path) => match Self::load_file(&path) {
                Ok(config) => {
                    info!("Configuration loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("{} - using compiled defaults", e);
                    Self::default()
                }
            },
            None => {
                info!("No configuration file found - using compiled defaults");
                Self::default()
            }
        };

        if let Ok(root) = std::env::var(PUBLIC_FILES_ENV_VAR) {
            config.public_files_root = PathBuf::from(root);
        }

        config
    }
}

/// Find the configuration file to load, if any
fn locate_config_file(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    // Priority 3: user then system config file
    let user_config = dirs::config_dir().map(|d| d.join("mothra").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }
    let system_config = PathBuf::from("/etc/mothra/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default for the public files root
fn default_public_files_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mothra").join("public").join("files"))
        .unwrap_or_else(|| PathBuf::from("./mothra/public/files"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MothraConfig::from_toml_str(
            r#"
            bind_address = "0.0.0.0:9000"

            [engines]
            prolog = "swipl"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.engines.prolog, "swipl");
        assert_eq!(config.engines.java, "java");
        assert_eq!(config.sdm.timeout_secs, 3600);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = MothraConfig::from_toml_str("bind_address = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
