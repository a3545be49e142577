use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::blob::DEFAULT_MAX_MODULE_SIZE;
use crate::convergence::ConvergenceConfig;
use crate::session::SessionDefaults;

pub mod validation;

/// Top-level client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: ClientOptions,
    #[serde(default)]
    pub policies: PoliciesConfig,
    #[serde(default)]
    pub udf: UdfOptions,
}

/// Connection options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Base URLs of the nodes used to reach the cluster
    #[serde(default)]
    pub seeds: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

/// Connection-level policy defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoliciesConfig {
    #[serde(default)]
    pub info: InfoPolicyConfig,
}

/// Default for `InfoPolicy::timeout` when a call leaves it unset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoPolicyConfig {
    #[serde(default = "default_info_timeout", with = "udf_common::duration_serde")]
    pub timeout: Duration,
}

impl Default for InfoPolicyConfig {
    fn default() -> Self {
        Self {
            timeout: default_info_timeout(),
        }
    }
}

/// UDF registry options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdfOptions {
    #[serde(default = "default_max_module_size")]
    pub max_module_size: u64,
    #[serde(default)]
    pub convergence: ConvergenceOptions,
}

impl Default for UdfOptions {
    fn default() -> Self {
        Self {
            max_module_size: default_max_module_size(),
            convergence: ConvergenceOptions::default(),
        }
    }
}

/// Convergence wait timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceOptions {
    #[serde(default = "default_convergence_timeout", with = "udf_common::duration_serde")]
    pub timeout: Duration,
    #[serde(default = "default_poll_interval", with = "udf_common::duration_serde")]
    pub poll_interval: Duration,
    #[serde(default = "default_max_poll_interval", with = "udf_common::duration_serde")]
    pub max_poll_interval: Duration,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            timeout: default_convergence_timeout(),
            poll_interval: default_poll_interval(),
            max_poll_interval: default_max_poll_interval(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(content)
            .context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Session defaults described by this configuration
    pub fn session_defaults(&self) -> SessionDefaults {
        let convergence = &self.udf.convergence;
        SessionDefaults {
            info_timeout: self.policies.info.timeout,
            max_module_size: self.udf.max_module_size,
            convergence: ConvergenceConfig {
                timeout: convergence.timeout,
                poll_interval: convergence.poll_interval,
                max_poll_interval: convergence.max_poll_interval,
            },
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_info_timeout() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_module_size() -> u64 {
    DEFAULT_MAX_MODULE_SIZE
}

fn default_convergence_timeout() -> Duration {
    Duration::from_millis(2000)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_max_poll_interval() -> Duration {
    Duration::from_millis(500)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let yaml = r#"
client:
  seeds:
    - http://127.0.0.1:3000
    - http://127.0.0.1:3001
  log_level: debug
policies:
  info:
    timeout: 750ms
udf:
  max_module_size: 65536
  convergence:
    timeout: 5s
    poll_interval: 20ms
    max_poll_interval: 200ms
"#;
        let config = ClientConfig::load_from_string(yaml).unwrap();
        assert_eq!(config.client.seeds.len(), 2);
        assert_eq!(config.client.log_level, "debug");

        let defaults = config.session_defaults();
        assert_eq!(defaults.info_timeout, Duration::from_millis(750));
        assert_eq!(defaults.max_module_size, 65536);
        assert_eq!(defaults.convergence.timeout, Duration::from_secs(5));
        assert_eq!(defaults.convergence.poll_interval, Duration::from_millis(20));
        assert_eq!(defaults.convergence.max_poll_interval, Duration::from_millis(200));
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::load_from_string("client:\n  seeds: [\"http://localhost:3000\"]\n").unwrap();
        assert_eq!(config.session_defaults(), SessionDefaults::default());
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let yaml = "udf:\n  convergence:\n    timeout: soon\n";
        assert!(ClientConfig::load_from_string(yaml).is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(ClientConfig::load_from_string("client: [").is_err());
    }
}
