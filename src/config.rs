//! YAML configuration file support for the firesift binary.
//!
//! A single file describes everything the process needs at startup: where
//! the match rules live, where to expose metrics, how the moderation store
//! is reached, queue bounds, and the facet thresholds.
//!
//! ## Example
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! rules:
//!   path: "/etc/firesift/rules.txt"
//!
//! metrics:
//!   listen: "0.0.0.0:9090"
//!
//! moderation:
//!   connection_string: "host=ozone-db password=secret dbname=ozone"
//!   refresh_secs: 600
//!
//! queues:
//!   frames: 10000
//!   events: 10000
//!
//! thresholds:
//!   mentions: 4
//!   tags: 4
//!   total: 6
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the firesift process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiresiftConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    pub rules: RulesConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,

    #[serde(default)]
    pub queues: QueueConfig,

    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl FiresiftConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FiresiftConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        if self.rules.path.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "rules.path must not be empty".to_string(),
            ));
        }
        self.metrics.listen_addr()?;
        if self.queues.frames == 0 || self.queues.events == 0 {
            return Err(ConfigLoadError::Validation(
                "queue bounds must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Path to the match rule file, one pattern per line.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Address the Prometheus exporter binds.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl MetricsConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigLoadError> {
        self.listen.parse().map_err(|_| {
            ConfigLoadError::Validation(format!(
                "metrics.listen is not a socket address: {}",
                self.listen
            ))
        })
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModerationConfig {
    /// Connection string for the moderation store; the adapter itself is
    /// supplied by the deployment.
    #[serde(default)]
    pub connection_string: Option<String>,

    /// Seconds between labeled-account refreshes.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_bound")]
    pub frames: usize,

    #[serde(default = "default_queue_bound")]
    pub events: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            frames: default_queue_bound(),
            events: default_queue_bound(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Shared threshold for mention and link facet counts.
    #[serde(default = "default_mention_threshold")]
    pub mentions: usize,

    #[serde(default = "default_tag_threshold")]
    pub tags: usize,

    #[serde(default = "default_total_threshold")]
    pub total: usize,
}

impl ThresholdConfig {
    pub fn to_thresholds(self) -> pipeline::FacetThresholds {
        pipeline::FacetThresholds {
            mentions: self.mentions,
            tags: self.tags,
            total: self.total,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            mentions: default_mention_threshold(),
            tags: default_tag_threshold(),
            total: default_total_threshold(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:9090".to_string()
}
fn default_refresh_secs() -> u64 {
    600
}
fn default_queue_bound() -> usize {
    10_000
}
fn default_mention_threshold() -> usize {
    4
}
fn default_tag_threshold() -> usize {
    4
}
fn default_total_threshold() -> usize {
    6
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn loads_minimal_yaml_with_defaults() {
        let yaml = r#"
version: "1.0"
rules:
  path: "/etc/firesift/rules.txt"
"#;
        let config = FiresiftConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rules.path, "/etc/firesift/rules.txt");
        assert_eq!(config.metrics.listen, "0.0.0.0:9090");
        assert_eq!(config.queues.frames, 10_000);
        assert_eq!(config.thresholds.mentions, 4);
        assert_eq!(config.thresholds.total, 6);
        assert_eq!(config.moderation.refresh_secs, 600);
    }

    #[test]
    fn loads_from_file() {
        let yaml = r#"
version: "1"
rules:
  path: "rules.txt"
queues:
  frames: 500
  events: 250
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = FiresiftConfig::from_file(file.path()).unwrap();
        assert_eq!(config.queues.frames, 500);
        assert_eq!(config.queues.events, 250);
    }

    #[test]
    fn rejects_unsupported_version() {
        let yaml = r#"
version: "2.0"
rules:
  path: "rules.txt"
"#;
        let result = FiresiftConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigLoadError::UnsupportedVersion(_))));
    }

    #[test]
    fn rejects_bad_listen_address() {
        let yaml = r#"
version: "1.0"
rules:
  path: "rules.txt"
metrics:
  listen: "not-an-address"
"#;
        let result = FiresiftConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigLoadError::Validation(_))));
    }

    #[test]
    fn rejects_zero_queue_bound() {
        let yaml = r#"
version: "1.0"
rules:
  path: "rules.txt"
queues:
  frames: 0
  events: 10
"#;
        let result = FiresiftConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigLoadError::Validation(_))));
    }
}
