//! Client configuration.
//!
//! Settings come from `~/.messageu/config.toml` when it exists, otherwise the
//! defaults below. Command-line flags override individual fields.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::transport::DEFAULT_MAX_RESPONSE_BYTES;

/// Default server address file.
pub const DEFAULT_SERVER_INFO: &str = "server.info";

/// Default identity file.
pub const DEFAULT_IDENTITY_FILE: &str = "my.info";

/// Default per-exchange timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found. Unable to determine home directory.")]
    NoConfigDir,

    #[error("Invalid server address '{0}': expected host:port")]
    InvalidAddress(String),

    #[error("IO error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Configuration for the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// File holding the server address.
    pub server_info: PathBuf,

    /// File holding the local identity.
    pub identity_file: PathBuf,

    /// Where received files are written; the system temp dir when unset.
    pub download_dir: Option<PathBuf>,

    /// Per-exchange timeout in seconds; no timeout when unset.
    pub timeout_secs: Option<u64>,

    /// Largest response payload accepted from the server.
    pub max_response_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_info: PathBuf::from(DEFAULT_SERVER_INFO),
            identity_file: PathBuf::from(DEFAULT_IDENTITY_FILE),
            download_dir: None,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl ClientConfig {
    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_in(dirs::home_dir().as_deref())
    }

    /// Load from `<home>/.messageu/config.toml`. Without a home directory
    /// there is no config file, so the defaults apply.
    pub fn load_in(home: Option<&Path>) -> Result<Self, ConfigError> {
        match home {
            Some(home) => Self::load_from(&config_file(home)),
            None => {
                debug!("no home directory, using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_file(&home))
    }

    /// The exchange timeout as a `Duration`.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn config_file(home: &Path) -> PathBuf {
    home.join(".messageu").join("config.toml")
}

/// Server address parsed from `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    /// Read the address from a `server.info` file (first non-empty line).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let line = content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("");
        line.parse()
    }
}

impl FromStr for ServerAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ConfigError::InvalidAddress(s.to_string());
        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port: u16 = port.parse().map_err(|_| invalid())?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server_info, PathBuf::from("server.info"));
        assert_eq!(config.identity_file, PathBuf::from("my.info"));
        assert_eq!(config.download_dir, None);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_response_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_load_without_home_gives_defaults() {
        assert_eq!(ClientConfig::load_in(None).unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_load_in_home() {
        let home = tempdir().unwrap();
        fs::create_dir_all(home.path().join(".messageu")).unwrap();
        fs::write(
            home.path().join(".messageu").join("config.toml"),
            "identity_file = \"/srv/messageu/my.info\"\n",
        )
        .unwrap();

        let config = ClientConfig::load_in(Some(home.path())).unwrap();
        assert_eq!(config.identity_file, PathBuf::from("/srv/messageu/my.info"));
        assert_eq!(config.server_info, PathBuf::from("server.info"));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "download_dir = \"/tmp/inbox\"\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.download_dir, Some(PathBuf::from("/tmp/inbox")));
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.identity_file, PathBuf::from("my.info"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout_secs = \"soon\"").unwrap();
        assert!(matches!(
            ClientConfig::load_from(&path),
            Err(ConfigError::TomlParseError(_))
        ));
    }

    #[test]
    fn test_server_address_parse() {
        let addr: ServerAddress = "127.0.0.1:1234".parse().unwrap();
        assert_eq!(addr.host, "127.0.0.1");
        assert_eq!(addr.port, 1234);
        assert_eq!(addr.to_string(), "127.0.0.1:1234");

        assert!("localhost".parse::<ServerAddress>().is_err());
        assert!(":80".parse::<ServerAddress>().is_err());
        assert!("host:99999".parse::<ServerAddress>().is_err());
    }

    #[test]
    fn test_server_address_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.info");
        fs::write(&path, "\n  example.org:8080  \n").unwrap();
        let addr = ServerAddress::load(&path).unwrap();
        assert_eq!(addr.to_string(), "example.org:8080");
    }

    #[test]
    fn test_server_address_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ServerAddress::load(&dir.path().join("server.info")),
            Err(ConfigError::IoError { .. })
        ));
    }
}
