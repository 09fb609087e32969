use std::path::{Path, PathBuf};

use relay_common::{Error, Result};
use tracing::{info, warn};

use crate::model::AppConfig;

pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Result<Self> {
        let config_dir = Self::default_config_dir();
        Ok(Self { config_dir })
    }

    pub fn default_config_dir() -> PathBuf {
        let home_config = dirs::home_dir().map(|h| h.join(".relay-agent"));
        let xdg_config = dirs::config_dir().map(|c| c.join("relay-agent"));

        match (xdg_config, home_config) {
            (Some(xdg), Some(home)) => {
                // Prefer XDG unless only the legacy home directory exists.
                if !xdg.exists() && home.exists() {
                    home
                } else {
                    xdg
                }
            }
            (Some(xdg), None) => xdg,
            (None, Some(home)) => home,
            (None, None) => PathBuf::from(".relay-agent"),
        }
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Directory plugins are discovered in unless the config overrides it.
    pub fn default_plugins_dir(&self) -> PathBuf {
        self.config_dir.join("plugins")
    }

    /// Load the config file (YAML preferred over TOML) and apply environment
    /// overrides. A `.env` file in the working directory is honoured.
    pub fn load(&self) -> Result<AppConfig> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("failed to read .env file: {e}");
            }
        }

        let mut config = self.load_file()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if config.plugins.dir.is_none() {
            config.plugins.dir = Some(self.default_plugins_dir());
        }

        Ok(config)
    }

    fn load_file(&self) -> Result<AppConfig> {
        let yaml_path = self.config_dir.join("config.yml");
        let toml_path = self.config_dir.join("config.toml");

        if yaml_path.exists() {
            info!("loading config from {}", yaml_path.display());
            let contents = std::fs::read_to_string(&yaml_path)?;
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse YAML config: {e}")))
        } else if toml_path.exists() {
            info!("loading config from {}", toml_path.display());
            let contents = std::fs::read_to_string(&toml_path)?;
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse TOML config: {e}")))
        } else {
            info!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        let dirs = [self.config_dir.clone(), self.default_plugins_dir()];

        for dir in &dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        Ok(())
    }
}

/// Overlay `AGENT_SECRET`, `HOST`, `PORT` and `RELAY_PLUGINS_DIR` on top of
/// the file-based config.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(secret) = lookup("AGENT_SECRET") {
        config.gateway.agent_secret = Some(secret);
    }
    if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
        config.gateway.host = host;
    }
    if let Some(port) = lookup("PORT") {
        match port.parse() {
            Ok(port) => config.gateway.port = port,
            Err(_) => warn!("ignoring invalid PORT value: {port}"),
        }
    }
    if let Some(dir) = lookup("RELAY_PLUGINS_DIR").filter(|d| !d.is_empty()) {
        config.plugins.dir = Some(PathBuf::from(dir));
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigLoader, apply_env_overrides};
    use crate::model::AppConfig;
    use std::collections::HashMap;
    use std::fs;

    #[test]
    fn load_file_returns_default_when_no_config_exists() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        let loader = ConfigLoader::with_dir(dir.path());
        let config = loader.load_file().expect("load should succeed");

        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.gateway.port, 3000);
        assert!(config.plugins.dir.is_none());
    }

    #[test]
    fn load_file_prefers_yaml_over_toml_when_both_exist() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        fs::write(
            dir.path().join("config.yml"),
            "gateway:\n  host: \"0.0.0.0\"\n  port: 4001\nplugins:\n  timeout_secs: 3\n",
        )
        .expect("failed to write yaml config");
        fs::write(
            dir.path().join("config.toml"),
            "[gateway]\nhost = \"127.0.0.2\"\nport = 4999\n",
        )
        .expect("failed to write toml config");

        let loader = ConfigLoader::with_dir(dir.path());
        let config = loader.load_file().expect("load should succeed");

        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 4001);
        assert_eq!(config.plugins.timeout_secs, 3);
        assert_eq!(config.metrics.max_history, 60);
    }

    #[test]
    fn load_file_reads_toml_when_yaml_missing() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");

        fs::write(
            dir.path().join("config.toml"),
            "[gateway]\nport = 4002\n\n[metrics]\ncommand = [\"sh\", \"-c\", \"echo\"]\n",
        )
        .expect("failed to write toml config");

        let loader = ConfigLoader::with_dir(dir.path());
        let config = loader.load_file().expect("load should succeed");

        assert_eq!(config.gateway.port, 4002);
        assert_eq!(
            config.metrics.command,
            Some(vec!["sh".to_string(), "-c".to_string(), "echo".to_string()])
        );
    }

    #[test]
    fn load_file_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        fs::write(dir.path().join("config.yml"), "gateway: [not, a, map]\n")
            .expect("failed to write yaml config");

        let loader = ConfigLoader::with_dir(dir.path());
        let err = loader.load_file().unwrap_err();
        assert!(err.to_string().contains("failed to parse YAML config"));
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AGENT_SECRET", "from-env"),
            ("PORT", "8081"),
            ("RELAY_PLUGINS_DIR", "/srv/plugins"),
        ]);

        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.gateway.agent_secret.as_deref(), Some("from-env"));
        assert_eq!(config.gateway.port, 8081);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(
            config.plugins.dir.as_deref(),
            Some(std::path::Path::new("/srv/plugins"))
        );
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| {
            (key == "PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.gateway.port, 3000);
    }

    #[test]
    fn ensure_dirs_creates_plugin_directory() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path().join("relay");
        let loader = ConfigLoader::with_dir(&root);

        loader.ensure_dirs().expect("ensure_dirs should succeed");

        assert!(root.exists());
        assert!(root.join("plugins").exists());
    }
}
