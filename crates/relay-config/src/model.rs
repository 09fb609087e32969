use relay_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            plugins: PluginsConfig::default(),
            metrics: MetricsConfig::default(),
            log_level: Some("info".to_string()),
        }
    }
}

impl AppConfig {
    /// Check the settings the agent cannot start without.
    pub fn validate(&self) -> Result<()> {
        match self.gateway.agent_secret.as_deref() {
            Some(secret) if !secret.is_empty() => {}
            _ => {
                return Err(Error::Config(
                    "AGENT_SECRET environment variable is required".into(),
                ));
            }
        }
        if self.gateway.rate_limit_max_requests == 0 {
            return Err(Error::Config(
                "gateway.rate_limit_max_requests must be greater than zero".into(),
            ));
        }
        if self.gateway.rate_limit_window_secs == 0 {
            return Err(Error::Config(
                "gateway.rate_limit_window_secs must be greater than zero".into(),
            ));
        }
        if self.plugins.timeout_secs == 0 {
            return Err(Error::Config(
                "plugins.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.plugins.python.is_empty() {
            return Err(Error::Config(
                "plugins.python must list at least one interpreter".into(),
            ));
        }
        if self.metrics.max_history == 0 || self.metrics.interval_ms == 0 {
            return Err(Error::Config(
                "metrics.interval_ms and metrics.max_history must be greater than zero".into(),
            ));
        }
        if matches!(&self.metrics.command, Some(cmd) if cmd.is_empty()) {
            return Err(Error::Config("metrics.command cannot be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret expected in the `x-agent-secret` header.
    #[serde(default)]
    pub agent_secret: Option<String>,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            agent_secret: None,
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
        }
    }
}

impl GatewayConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Plugin directory. Defaults to `<config_dir>/plugins`.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_plugin_timeout_secs")]
    pub timeout_secs: u64,

    /// Interpreter candidates for `.py` plugins, tried in order.
    #[serde(default = "default_python")]
    pub python: Vec<String>,

    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default = "default_node")]
    pub node: String,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            timeout_secs: default_plugin_timeout_secs(),
            python: default_python(),
            shell: default_shell(),
            node: default_node(),
        }
    }
}

impl PluginsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_plugin_timeout_secs() -> u64 {
    10
}

fn default_python() -> Vec<String> {
    vec!["python3".to_string(), "python".to_string()]
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_node() -> String {
    "node".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// External command printing `{"cpu": .., "memory": ..}`. When unset the
    /// agent samples in-process.
    #[serde(default)]
    pub command: Option<Vec<String>>,

    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_history: default_max_history(),
            command: None,
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl MetricsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_history() -> usize {
    60
}

fn default_command_timeout_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    fn with_secret() -> AppConfig {
        let mut config = AppConfig::default();
        config.gateway.agent_secret = Some("s3cret".to_string());
        config
    }

    #[test]
    fn defaults_match_relay_conventions() {
        let config = AppConfig::default();
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.gateway.rate_limit_max_requests, 20);
        assert_eq!(config.plugins.timeout_secs, 10);
        assert_eq!(config.plugins.python, vec!["python3", "python"]);
        assert_eq!(config.metrics.max_history, 60);
        assert_eq!(config.metrics.interval_ms, 1000);
    }

    #[test]
    fn validate_requires_secret() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AGENT_SECRET"));

        let mut empty = AppConfig::default();
        empty.gateway.agent_secret = Some(String::new());
        assert!(empty.validate().is_err());

        assert!(with_secret().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = with_secret();
        config.plugins.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = with_secret();
        config.metrics.max_history = 0;
        assert!(config.validate().is_err());

        let mut config = with_secret();
        config.metrics.command = Some(vec![]);
        assert!(config.validate().is_err());
    }
}
