use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Environment variable that overrides `backend.base_url`.
pub const BASE_URL_ENV: &str = "CARTBOT_BASE_URL";

/// Top-level configuration for the Cartbot client.
///
/// Loaded from `~/.cartbot/config.toml` by default. Every section falls
/// back to its defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartbotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl CartbotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CartbotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply `CARTBOT_BASE_URL` on top of the file value, if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend.base_url = url;
            }
        }
    }
}

/// General client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Directory holding the saved login token.
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: "~/.cartbot".to_string(),
        }
    }
}

impl GeneralConfig {
    /// The data directory with a leading `~` expanded to the home directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }
}

/// Chat backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            user_agent: format!("cartbot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Expand `~/` (or `~\`) to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let rest = path.get(2..).unwrap_or("");
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CartbotError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = CartbotConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.data_dir, "~/.cartbot");
        assert_eq!(config.backend.base_url, "http://localhost:5000/api");
        assert!(config.backend.user_agent.starts_with("cartbot/"));
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"
data_dir = "/tmp/cartbot"

[backend]
base_url = "https://shop.example.com/api"
"#;
        let file = create_temp_config(content);
        let config = CartbotConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.data_dir, "/tmp/cartbot");
        assert_eq!(config.backend.base_url, "https://shop.example.com/api");
        // Missing keys inside a present section still default.
        assert!(config.backend.user_agent.starts_with("cartbot/"));
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = CartbotConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.backend.base_url, "http://localhost:5000/api");
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = CartbotConfig::load(file.path());
        assert!(matches!(result, Err(CartbotError::Config(_))));
    }

    #[test]
    fn test_config_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        let mut config = CartbotConfig::default();
        config.backend.base_url = "http://127.0.0.1:9000/api".to_string();
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = CartbotConfig::load(&path).unwrap();
        assert_eq!(reloaded.backend.base_url, "http://127.0.0.1:9000/api");
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/var/lib/cartbot"), PathBuf::from("/var/lib/cartbot"));
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn test_expand_home_tilde_prefix() {
        let expanded = expand_home("~/.cartbot");
        assert!(expanded.ends_with(".cartbot"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
