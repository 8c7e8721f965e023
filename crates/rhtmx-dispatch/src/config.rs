// File: src/config.rs
// Purpose: Dispatcher configuration parsing from rhtmx.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Server configuration, used by [`crate::service::serve`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingConfig {
    /// Base path every route is mounted under (e.g., "/app")
    #[serde(default)]
    pub base_path: Option<String>,

    /// Match request paths exactly as sent; when off, paths are normalized
    /// (`/about/` and `/about//` both become `/about`)
    #[serde(default = "default_false")]
    pub trailing_slash: bool,

    /// Largest request body accepted by the axum adapter, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

// Default values
fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_body_limit() -> usize {
    2 * 1024 * 1024
}

fn default_false() -> bool {
    false
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            trailing_slash: false,
            body_limit: default_body_limit(),
        }
    }
}

impl RoutingConfig {
    /// Base path as the compiler expects it (`""` for none)
    pub fn base_path(&self) -> &str {
        self.base_path.as_deref().unwrap_or("")
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from default path (./rhtmx.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("rhtmx.toml")
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.routing.base_path(), "");
        assert!(!config.routing.trailing_slash);
        assert_eq!(config.routing.body_limit, 2 * 1024 * 1024);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_toml("  \n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load("definitely/not/here/rhtmx.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_routing_section() {
        let toml = r#"
            [routing]
            base_path = "/app"
            trailing_slash = true
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.routing.base_path(), "/app");
        assert!(config.routing.trailing_slash);
        assert_eq!(config.routing.body_limit, 2 * 1024 * 1024);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml("[routing\nbase_path = 1").is_err());
    }
}
