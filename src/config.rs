//! Configuration for the demo generation service
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration. `load_from_file` validates after parsing.

use crate::codegen::GeneratorOptions;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSection,
    /// Options applied when a generate request omits them
    #[serde(default)]
    pub generator: GeneratorOptions,
}

/// HTTP listener and session storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Listen address; must be an IP literal
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Each session gets a subdirectory named after its id
    #[serde(default = "default_session_root")]
    pub session_root: PathBuf,
    /// Static files served at `/`
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_root: default_session_root(),
            static_dir: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_session_root() -> PathBuf {
    std::env::temp_dir().join("eventwire")
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidConfig(format!(
                "[server] host must be an IP address, got '{}'",
                self.server.host
            )));
        }

        if self.server.session_root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "[server] session_root must not be empty".to_string(),
            ));
        }

        let generator = &self.generator;
        if !(generator.include_server || generator.include_client || generator.include_webclient) {
            return Err(ConfigError::InvalidConfig(
                "[generator] must include at least one of server, client, webclient".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address for the listener
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server.host.trim().parse().map_err(|_| {
            ConfigError::InvalidConfig(format!("invalid host '{}'", self.server.host))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    #[cfg(test)]
    pub fn test_config(session_root: &Path) -> Self {
        Self {
            server: ServerSection {
                session_root: session_root.to_path_buf(),
                ..ServerSection::default()
            },
            generator: GeneratorOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(
            config.server.session_root,
            std::env::temp_dir().join("eventwire")
        );
        assert!(config.server.static_dir.is_none());
        assert_eq!(config.generator, GeneratorOptions::default());
        assert_eq!(
            config.listen_addr().unwrap(),
            "127.0.0.1:8000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_full_document() {
        let toml_content = r#"
[server]
host = "0.0.0.0"
port = 9100
session_root = "/var/lib/eventwire"
static_dir = "web"

[generator]
include_client = false
integrate_webclient = true
"#;

        let config = ServiceConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.server.session_root,
            PathBuf::from("/var/lib/eventwire")
        );
        assert_eq!(config.server.static_dir, Some(PathBuf::from("web")));
        assert!(config.generator.include_server);
        assert!(!config.generator.include_client);
        assert!(config.generator.integrate_webclient);
        assert_eq!(config.listen_addr().unwrap().port(), 9100);
    }

    #[test]
    fn test_invalid_toml() {
        let result = ServiceConfig::from_toml_str("[server\nport = 1");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let result = ServiceConfig::from_toml_str("[server]\nport = \"eighty\"");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_host_must_be_ip() {
        let result = ServiceConfig::from_toml_str("[server]\nhost = \"  \"");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

        let result = ServiceConfig::from_toml_str("[server]\nhost = \"localhost\"");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

        let config = ServiceConfig::from_toml_str("[server]\nhost = \"::1\"").unwrap();
        assert!(config.listen_addr().unwrap().is_ipv6());
    }

    #[test]
    fn test_generator_must_emit_something() {
        let toml_content = r#"
[generator]
include_server = false
include_client = false
include_webclient = false
"#;
        let err = ServiceConfig::from_toml_str(toml_content).unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn test_missing_file() {
        let result = ServiceConfig::load_from_file(Path::new("/nonexistent/eventwire.toml"));
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }
}
